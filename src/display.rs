//! Generated-image card rendering.
//!
//! Pure presentation: the card shows a spinner while a generation is in
//! flight, the image once a source is known, and a hint otherwise.

use std::borrow::Cow;

pub const LOADING_LABEL: &str = "Generating Your Image . . .";
pub const PLACEHOLDER_LABEL: &str = "Write a prompt to generate image";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardView<'a> {
    Loading,
    Image(&'a str),
    Placeholder,
}

impl<'a> CardView<'a> {
    /// Loading wins over an existing source; an empty source counts as none.
    pub fn from_props(src: Option<&'a str>, loading: bool) -> Self {
        if loading {
            return CardView::Loading;
        }
        match src {
            Some(src) if !src.is_empty() => CardView::Image(src),
            _ => CardView::Placeholder,
        }
    }

    pub fn render(&self) -> String {
        let inner = match self {
            CardView::Loading => format!(
                r#"<span class="spinner" role="progressbar"></span>{}"#,
                LOADING_LABEL
            ),
            CardView::Image(src) => format!(r#"<img src="{}" />"#, escape_attribute(src)),
            CardView::Placeholder => PLACEHOLDER_LABEL.to_string(),
        };
        format!(r#"<div class="generated-image-card">{}</div>"#, inner)
    }
}

/// `<img>` source for a handler result: data URLs pass through, bare base64
/// is wrapped with its content type.
pub fn image_src<'a>(photo: &'a str, content_type: &str) -> Cow<'a, str> {
    if photo.starts_with("data:") {
        Cow::Borrowed(photo)
    } else {
        Cow::Owned(format!("data:{};base64,{}", content_type, photo))
    }
}

fn escape_attribute(value: &str) -> Cow<'_, str> {
    if !value.contains(['&', '"', '\'', '<', '>']) {
        return Cow::Borrowed(value);
    }
    let mut escaped = String::with_capacity(value.len() + 16);
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(ch),
        }
    }
    Cow::Owned(escaped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placeholder::MOCK_DATA_URL;

    #[test]
    fn test_loading_takes_precedence() {
        assert_eq!(CardView::from_props(Some("data:x"), true), CardView::Loading);
        let html = CardView::Loading.render();
        assert!(html.contains(LOADING_LABEL));
        assert!(html.contains("spinner"));
    }

    #[test]
    fn test_image_when_src_present() {
        let view = CardView::from_props(Some("data:image/png;base64,AAAA"), false);
        assert_eq!(view, CardView::Image("data:image/png;base64,AAAA"));
        assert_eq!(
            view.render(),
            r#"<div class="generated-image-card"><img src="data:image/png;base64,AAAA" /></div>"#
        );
    }

    #[test]
    fn test_placeholder_without_src() {
        assert_eq!(CardView::from_props(None, false), CardView::Placeholder);
        assert_eq!(CardView::from_props(Some(""), false), CardView::Placeholder);
        assert!(CardView::Placeholder.render().contains(PLACEHOLDER_LABEL));
    }

    #[test]
    fn test_svg_data_url_is_attribute_escaped() {
        let html = CardView::Image(MOCK_DATA_URL).render();
        assert!(html.contains("&lt;svg xmlns=&#39;http://www.w3.org/2000/svg&#39;"));
        assert!(!html.contains("<svg"));
    }

    #[test]
    fn test_image_src_wraps_bare_base64() {
        assert_eq!(
            image_src("iVBORw0KGgo=", "image/png"),
            "data:image/png;base64,iVBORw0KGgo="
        );
        assert_eq!(image_src(MOCK_DATA_URL, "image/svg+xml"), MOCK_DATA_URL);
    }
}
