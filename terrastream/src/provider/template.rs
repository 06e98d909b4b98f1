//! Tile URL templates.
//!
//! A template such as `https://tiles.example.com/{z}/{x}/{y}.png` is parsed
//! once into literal and token segments, then expanded per request.

use crate::coord::TileAddress;
use std::fmt;
use thiserror::Error;

/// Errors from parsing a URL template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// A `{...}` token the expander does not know
    #[error("Unknown template token '{{{0}}}'")]
    UnknownToken(String),

    /// A `{` without a closing `}`
    #[error("Unterminated template token starting at byte {0}")]
    Unterminated(usize),

    /// Template has no coordinate token at all
    #[error("Template '{0}' does not reference the tile address")]
    NoAddressToken(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    X,
    Y,
    Zoom,
    Resolution,
    Quadkey,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Token(Token),
}

/// A parsed tile URL template.
///
/// Supported tokens: `{x}`, `{y}`, `{z}`, `{resolution}` and `{quadkey}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl UrlTemplate {
    pub fn parse(template: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = template;
        let mut offset = 0;

        while let Some(open) = rest.find('{') {
            literal.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let close = after
                .find('}')
                .ok_or(TemplateError::Unterminated(offset + open))?;
            let token = match &after[..close] {
                "x" => Token::X,
                "y" => Token::Y,
                "z" | "zoom" => Token::Zoom,
                "resolution" => Token::Resolution,
                "quadkey" => Token::Quadkey,
                other => return Err(TemplateError::UnknownToken(other.to_string())),
            };
            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(Segment::Token(token));

            let consumed = open + 1 + close + 1;
            offset += consumed;
            rest = &rest[consumed..];
        }
        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        let addressed = segments.iter().any(|s| {
            matches!(
                s,
                Segment::Token(Token::X | Token::Y | Token::Zoom | Token::Quadkey)
            )
        });
        if !addressed {
            return Err(TemplateError::NoAddressToken(template.to_string()));
        }

        Ok(Self {
            source: template.to_string(),
            segments,
        })
    }

    /// Substitutes the tokens for one tile.
    pub fn expand(&self, address: &TileAddress, resolution: u32) -> String {
        let mut url = String::with_capacity(self.source.len() + 16);
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => url.push_str(text),
                Segment::Token(Token::X) => url.push_str(&address.x.to_string()),
                Segment::Token(Token::Y) => url.push_str(&address.y.to_string()),
                Segment::Token(Token::Zoom) => url.push_str(&address.zoom.to_string()),
                Segment::Token(Token::Resolution) => url.push_str(&resolution.to_string()),
                Segment::Token(Token::Quadkey) => url.push_str(&address.quadkey()),
            }
        }
        url
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for UrlTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl std::str::FromStr for UrlTemplate {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_xyz() {
        let template = UrlTemplate::parse("https://t.example/{z}/{x}/{y}.png").unwrap();
        let url = template.expand(&TileAddress::new(3, 5, 4), 256);
        assert_eq!(url, "https://t.example/4/3/5.png");
    }

    #[test]
    fn test_expand_resolution() {
        let template = UrlTemplate::parse("http://dem/{z}/{x}/{y}?size={resolution}").unwrap();
        let url = template.expand(&TileAddress::new(0, 1, 1), 65);
        assert_eq!(url, "http://dem/1/0/1?size=65");
    }

    #[test]
    fn test_expand_quadkey() {
        let template = UrlTemplate::parse("https://ecn.t0.tiles/a{quadkey}.jpeg?g=1").unwrap();
        let url = template.expand(&TileAddress::new(1, 2, 2), 256);
        assert_eq!(url, "https://ecn.t0.tiles/a21.jpeg?g=1");
    }

    #[test]
    fn test_unknown_token() {
        let err = UrlTemplate::parse("http://x/{s}/{z}/{x}/{y}").unwrap_err();
        assert_eq!(err, TemplateError::UnknownToken("s".to_string()));
        assert_eq!(err.to_string(), "Unknown template token '{s}'");
    }

    #[test]
    fn test_unterminated_token() {
        let err = UrlTemplate::parse("http://x/{z}/{x").unwrap_err();
        assert_eq!(err, TemplateError::Unterminated(13));
    }

    #[test]
    fn test_requires_address_token() {
        assert!(matches!(
            UrlTemplate::parse("http://x/static.png"),
            Err(TemplateError::NoAddressToken(_))
        ));
    }

    #[test]
    fn test_display_roundtrip() {
        let text = "http://x/{z}/{x}/{y}";
        let template: UrlTemplate = text.parse().unwrap();
        assert_eq!(template.to_string(), text);
    }
}
