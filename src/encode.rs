/// HTML-entity encoding for `{{name}}`; `{{{name}}}` skips this.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn unescape(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_entities() {
        assert_eq!("&lt;a&gt; &amp; &quot;b&quot;", escape("<a> & \"b\""));
    }

    #[test]
    fn round_trips() {
        let text = "<a href=\"x\">Tom & Jerry's</a>";
        assert_eq!(text, unescape(&escape(text)));
    }
}
