//! Reading and editing the inline `style` attribute.

use super::dom::ElementData;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub value: String,
}

/// Split `a: b; c: d` into declarations. Names are lowercased; entries
/// without a colon or name are dropped.
pub fn parse_declarations(input: &str) -> Vec<Declaration> {
    input
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.split_once(':')?;
            let name = name.trim().to_ascii_lowercase();
            if name.is_empty() {
                return None;
            }
            Some(Declaration {
                name,
                value: value.trim().to_string(),
            })
        })
        .collect()
}

fn write_declarations(declarations: &[Declaration]) -> String {
    declarations
        .iter()
        .map(|d| format!("{}: {};", d.name, d.value))
        .collect::<Vec<_>>()
        .join(" ")
}

impl ElementData {
    pub fn style_property(&self, name: &str) -> Option<String> {
        parse_declarations(self.attr("style")?)
            .into_iter()
            .rev()
            .find(|d| d.name == name)
            .map(|d| d.value)
    }

    /// Set one property, replacing every earlier declaration of it.
    pub fn set_style_property(&mut self, name: &str, value: &str) {
        let mut declarations = self
            .attr("style")
            .map(parse_declarations)
            .unwrap_or_default();
        let name = name.to_ascii_lowercase();
        declarations.retain(|d| d.name != name);
        declarations.push(Declaration {
            name,
            value: value.to_string(),
        });
        self.set_attr("style", write_declarations(&declarations));
    }
}
