#[cfg(test)]
mod tests;

use itertools::Itertools;
use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use scraper::Html;

/// Elements whose text is never shown to a reader
const HIDDEN_ELEMENTS: [&str; 6] = ["head", "script", "style", "noscript", "template", "svg"];

/// Elements that start on a new line when rendered
const BLOCK_ELEMENTS: [&str; 22] = [
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dt", "footer", "h1", "h2",
    "h3", "h4", "h5", "h6", "header", "li", "p", "pre", "section", "td", "tr",
];

/// Render Markdown to plain text, dropping markup and inline HTML
pub fn markdown_to_text(markdown: &str) -> String {
    let mut text = String::with_capacity(markdown.len());

    for event in Parser::new(markdown) {
        match event {
            Event::Text(t) | Event::Code(t) => text.push_str(&t),
            Event::SoftBreak => text.push(' '),
            Event::HardBreak => text.push('\n'),
            Event::Start(Tag::Item) => {
                if !text.is_empty() && !text.ends_with('\n') {
                    text.push('\n');
                }
            }
            Event::End(
                TagEnd::Paragraph
                | TagEnd::Heading(_)
                | TagEnd::Item
                | TagEnd::CodeBlock
                | TagEnd::BlockQuote(_)
                | TagEnd::TableRow,
            ) => text.push('\n'),
            Event::End(TagEnd::TableCell) => text.push(' '),
            _ => {}
        }
    }

    text.lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .join("\n")
}

/// Visible text of an HTML document with whitespace collapsed
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut text = String::with_capacity(html.len() / 2);

    for node in document.tree.root().descendants() {
        if node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|e| HIDDEN_ELEMENTS.contains(&e.name()))
        }) {
            continue;
        }

        if let Some(element) = node.value().as_element() {
            if BLOCK_ELEMENTS.contains(&element.name()) {
                text.push('\n');
            }
        } else if let Some(fragment) = node.value().as_text() {
            text.push_str(fragment);
        }
    }

    text.lines()
        .map(|line| line.split_whitespace().join(" "))
        .filter(|line| !line.is_empty())
        .join("\n")
}
