/// Telegram MarkdownV2 helpers
pub mod markdown {
    /// Characters that must be backslash-escaped anywhere in a MarkdownV2 message.
    const SPECIAL: &[char] = &[
        '\\', '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}',
        '.', '!',
    ];

    pub fn escape(src: &str) -> String {
        let mut escaped = String::with_capacity(src.len() + src.len() / 8);
        for c in src.chars() {
            if SPECIAL.contains(&c) {
                escaped.push('\\');
            }
            escaped.push(c);
        }
        escaped
    }
}

/// Text processing utilities
pub mod text {
    use regex::Regex;
    use scraper::{ElementRef, Html, Node, Selector};
    use std::sync::LazyLock;

    static REDUNDANT_NEWLINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

    const CONTENT_ROOTS: &[&str] = &["article", "main", "body"];
    const SKIPPED: &[&str] = &["script", "style", "noscript", "template", "head", "nav", "footer"];
    const BLOCKS: &[&str] = &[
        "p", "div", "br", "li", "ul", "ol", "section", "article", "header", "h1", "h2", "h3",
        "h4", "h5", "h6", "tr", "blockquote", "pre", "figure", "figcaption", "table",
    ];

    /// Replace every run of three or more newlines with a single blank line.
    pub fn collapse_blank_lines(text: &str) -> String {
        REDUNDANT_NEWLINES.replace_all(text, "\n\n").into_owned()
    }

    /// Extract the readable text of an HTML page or fragment.
    ///
    /// Input without markup is returned trimmed. The first non-empty of
    /// `<article>`, `<main>` and `<body>` is used as the content root.
    pub fn readable_text(html: &str) -> String {
        if !html.contains('<') {
            return html.trim().to_string();
        }

        let document = Html::parse_document(html);

        for root in CONTENT_ROOTS {
            let Ok(selector) = Selector::parse(root) else {
                continue;
            };
            for element in document.select(&selector) {
                let text = element_text(element);
                if !text.is_empty() {
                    return text;
                }
            }
        }

        String::new()
    }

    fn element_text(root: ElementRef<'_>) -> String {
        let mut raw = String::new();

        for node in root.descendants() {
            match node.value() {
                Node::Element(element) if BLOCKS.contains(&element.name()) => raw.push('\n'),
                Node::Text(text) => {
                    let hidden = node.ancestors().any(|ancestor| {
                        ancestor
                            .value()
                            .as_element()
                            .is_some_and(|e| SKIPPED.contains(&e.name()))
                    });
                    if !hidden {
                        raw.push_str(text);
                    }
                }
                _ => {}
            }
        }

        let lines: Vec<String> = raw
            .lines()
            .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
            .collect();

        collapse_blank_lines(lines.join("\n").trim())
    }

    /// Drop a trailing unfinished sentence, keeping everything up to the last period.
    pub fn trim_to_last_sentence(text: &str) -> String {
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed.ends_with('.') {
            return trimmed.to_string();
        }

        match trimmed.rfind('.') {
            Some(last_period) => trimmed[..=last_period].to_string(),
            None => trimmed.to_string(),
        }
    }
}
