use ego_tree::iter::Edge;
use ego_tree::NodeId;
use scraper::node::{Element, Node};
use scraper::ElementRef;

/// Renders the text a reader would see inside `element`.
///
/// Approximates a browser's rendered text: whitespace runs collapse, block
/// elements start new lines, table cells in a row are tab separated, and
/// hidden elements are skipped.
///
/// The walk is iterative, so nesting depth is bounded only by memory.
pub fn visible_text(element: ElementRef) -> String {
    let root = element.id();
    let mut ctx = TextContext::default();
    // Open hidden subtree, if any; everything inside it is ignored.
    let mut skipped: Option<NodeId> = None;

    for edge in element.traverse() {
        match edge {
            Edge::Open(node) => {
                if skipped.is_some() || node.id() == root {
                    continue;
                }
                match node.value() {
                    Node::Text(text) => ctx.append_text(text),
                    Node::Element(el) => match layout(el) {
                        Layout::Skip => skipped = Some(node.id()),
                        Layout::LineBreak => ctx.newline(),
                        Layout::Cell => {
                            if !ctx.at_line_start() {
                                ctx.push_separator('\t');
                            }
                        }
                        Layout::Block => ctx.newline(),
                        Layout::Inline => {}
                    },
                    _ => {}
                }
            }
            Edge::Close(node) => {
                if skipped == Some(node.id()) {
                    skipped = None;
                    continue;
                }
                if skipped.is_some() || node.id() == root {
                    continue;
                }
                if let Node::Element(el) = node.value() {
                    if layout(el) == Layout::Block {
                        ctx.newline();
                    }
                }
            }
        }
    }
    ctx.finish()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    Skip,
    LineBreak,
    Cell,
    Block,
    Inline,
}

fn layout(el: &Element) -> Layout {
    if is_hidden(el) {
        return Layout::Skip;
    }
    match el.name().to_ascii_lowercase().as_str() {
        "script" | "style" | "noscript" | "template" | "iframe" | "head" | "title" => Layout::Skip,
        "br" => Layout::LineBreak,
        "td" | "th" => Layout::Cell,
        "p" | "div" | "section" | "article" | "main" | "header" | "footer" | "nav" | "aside"
        | "figure" | "figcaption" | "table" | "caption" | "thead" | "tbody" | "tfoot" | "tr"
        | "blockquote" | "address" | "ul" | "ol" | "li" | "dl" | "dt" | "dd" | "pre"
        | "form" | "fieldset" | "hr" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => Layout::Block,
        _ => Layout::Inline,
    }
}

fn is_hidden(el: &Element) -> bool {
    if el.attr("hidden").is_some() {
        return true;
    }
    if el
        .attr("aria-hidden")
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
    {
        return true;
    }
    el.attr("style").is_some_and(|style| {
        let compact: String = style
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        compact.contains("display:none") || compact.contains("visibility:hidden")
    })
}

#[derive(Default)]
struct TextContext {
    builder: String,
    last_char: Option<char>,
}

impl TextContext {
    fn finish(self) -> String {
        self.builder.trim().to_string()
    }

    fn at_line_start(&self) -> bool {
        matches!(self.last_char, None | Some('\n'))
    }

    fn append_text(&mut self, text: &str) {
        for ch in text.chars() {
            if ch.is_whitespace() {
                if self.at_line_start() || matches!(self.last_char, Some(' ') | Some('\t')) {
                    continue;
                }
                self.push_char(' ');
            } else {
                self.push_char(ch);
            }
        }
    }

    fn push_separator(&mut self, sep: char) {
        self.trim_trailing_spaces();
        self.push_char(sep);
    }

    fn newline(&mut self) {
        self.trim_trailing_spaces();
        if self.at_line_start() {
            return;
        }
        self.push_char('\n');
    }

    fn trim_trailing_spaces(&mut self) {
        while self.builder.ends_with(' ') {
            self.builder.pop();
        }
        self.last_char = self.builder.chars().next_back();
    }

    fn push_char(&mut self, ch: char) {
        self.builder.push(ch);
        self.last_char = Some(ch);
    }
}

#[cfg(test)]
mod tests {
    use scraper::{Html, Selector};

    use super::visible_text;

    fn body_text(html: &str) -> String {
        let doc = Html::parse_document(html);
        let body = Selector::parse("body").unwrap();
        visible_text(doc.select(&body).next().unwrap())
    }

    #[test]
    fn whitespace_collapses_and_blocks_break_lines() {
        let text = body_text("<p>  Hello\n   world </p><div>Next   line</div>");
        assert_eq!(text, "Hello world\nNext line");
    }

    #[test]
    fn table_cells_are_tab_separated() {
        let text = body_text("<table><tr><th>h1</th><th>h2</th></tr><tr><td>a</td><td>b</td></tr></table>");
        assert_eq!(text, "h1\th2\na\tb");
    }

    #[test]
    fn hidden_elements_are_skipped() {
        let text = body_text(
            r#"<p>shown</p><p hidden>gone</p><p style="display: none">gone</p><span aria-hidden="true">gone</span>"#,
        );
        assert_eq!(text, "shown");
    }

    #[test]
    fn inline_elements_keep_flow() {
        let text = body_text("<p>A <b>bold</b> <a href='#'>link</a>.<br>Second</p>");
        assert_eq!(text, "A bold link.\nSecond");
    }

    #[test]
    fn hidden_subtree_ends_at_its_own_close() {
        let text = body_text("<div hidden><p>gone</p><div>gone</div></div><p>after</p>");
        assert_eq!(text, "after");
    }
}
