//! A small element builder for the fixed XML documents NiFi is configured
//! with.
//!
//! The builder exists to make two constraints hold by construction: the
//! documents are always well-formed, and the first line of a rendered
//! document is exactly the XML declaration the NiFi runtime insists on.
//! Values are trusted configuration constants and runtime placeholders, they
//! are written verbatim without escaping.

use std::fmt::Write as _;

const INDENT: usize = 4;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Standalone {
    Yes,
    No,
}

impl Standalone {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Yes => "yes",
            Self::No => "no",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct XmlElement {
    name: String,
    children: Vec<XmlNode>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
enum XmlNode {
    Element(XmlElement),
    Text(String),
    /// A `<property name="...">value</property>` leaf, the building block of
    /// NiFi's provider configuration files.
    Property {
        name: String,
        value: String,
    },
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    pub fn child(&mut self, child: Self) -> &mut Self {
        self.children.push(XmlNode::Element(child));
        self
    }

    /// Adds a child element containing only the given text.
    pub fn child_text(&mut self, name: impl Into<String>, text: impl Into<String>) -> &mut Self {
        let mut child = Self::new(name);
        child.children.push(XmlNode::Text(text.into()));
        self.children.push(XmlNode::Element(child));
        self
    }

    pub fn property(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.children.push(XmlNode::Property {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    fn render(&self, out: &mut String, depth: usize) {
        let indent = " ".repeat(depth * INDENT);
        let name = &self.name;

        match self.children.as_slice() {
            [] => {
                let _ = writeln!(out, "{indent}<{name}></{name}>");
            }
            [XmlNode::Text(text)] => {
                let _ = writeln!(out, "{indent}<{name}>{text}</{name}>");
            }
            children => {
                let _ = writeln!(out, "{indent}<{name}>");
                for child in children {
                    child.render(out, depth + 1);
                }
                let _ = writeln!(out, "{indent}</{name}>");
            }
        }
    }
}

impl XmlNode {
    fn render(&self, out: &mut String, depth: usize) {
        let indent = " ".repeat(depth * INDENT);
        match self {
            Self::Element(element) => element.render(out, depth),
            Self::Text(text) => {
                let _ = writeln!(out, "{indent}{text}");
            }
            Self::Property { name, value } => {
                let _ = writeln!(out, "{indent}<property name=\"{name}\">{value}</property>");
            }
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct XmlDocument {
    root: XmlElement,
    standalone: Standalone,
}

impl XmlDocument {
    pub fn new(root: XmlElement, standalone: Standalone) -> Self {
        Self { root, standalone }
    }

    pub fn render(&self) -> String {
        let mut out = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"{standalone}\"?>\n",
            standalone = self.standalone.as_str()
        );
        self.root.render(&mut out, 0);
        out
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    #[test]
    fn declaration_is_the_first_line() {
        let document = XmlDocument::new(XmlElement::new("loginIdentityProviders"), Standalone::No);
        let rendered = document.render();

        assert!(rendered.starts_with(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"no\"?>\n"
        ));
    }

    #[test]
    fn nested_rendering() {
        let mut provider = XmlElement::new("provider");
        provider
            .child_text("identifier", "login-identity-provider")
            .property("Username", "admin");

        let mut root = XmlElement::new("loginIdentityProviders");
        root.child(provider);

        let rendered = XmlDocument::new(root, Standalone::No).render();
        assert_eq!(rendered, indoc! {r#"
            <?xml version="1.0" encoding="UTF-8" standalone="no"?>
            <loginIdentityProviders>
                <provider>
                    <identifier>login-identity-provider</identifier>
                    <property name="Username">admin</property>
                </provider>
            </loginIdentityProviders>
        "#});
    }

    #[test]
    fn empty_element() {
        let rendered = XmlDocument::new(XmlElement::new("loginIdentityProviders"), Standalone::No)
            .render();
        assert_eq!(
            rendered,
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"no\"?>\n\
             <loginIdentityProviders></loginIdentityProviders>\n"
        );
    }
}
