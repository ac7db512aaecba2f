//! Terminal kinds and terminal output naming.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::util::{Error, Result};
use super::{OUTPUTS_PREFIX, UNIVERSAL_RENDER_CONTEXT};

/// Shading role a material resolves to a shader output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminalKind {
    Surface,
    Displacement,
    Volume,
}

impl TerminalKind {
    pub const ALL: [TerminalKind; 3] = [Self::Surface, Self::Displacement, Self::Volume];

    /// Terminal name, e.g. `surface`.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Surface => "surface",
            Self::Displacement => "displacement",
            Self::Volume => "volume",
        }
    }

    /// Parse a terminal name.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    /// Attribute name of the terminal output for a render context.
    ///
    /// The universal context gives `outputs:surface`, context `ri` gives
    /// `outputs:ri:surface`.
    pub fn output_name(self, render_context: &str) -> String {
        if render_context == UNIVERSAL_RENDER_CONTEXT {
            format!("{}{}", OUTPUTS_PREFIX, self.name())
        } else {
            format!("{}{}:{}", OUTPUTS_PREFIX, render_context, self.name())
        }
    }

    /// Split a terminal output attribute name into kind and render context.
    pub fn split_output_name(attr: &str) -> Option<(Self, &str)> {
        let rest = attr.strip_prefix(OUTPUTS_PREFIX)?;
        match rest.rsplit_once(':') {
            Some((ctx, term)) if !ctx.is_empty() => Some((Self::parse(term)?, ctx)),
            Some(_) => None,
            None => Some((Self::parse(rest)?, UNIVERSAL_RENDER_CONTEXT)),
        }
    }
}

impl fmt::Display for TerminalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TerminalKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| Error::invalid(format!("unknown terminal '{}'", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_names() {
        assert_eq!(TerminalKind::Surface.output_name(""), "outputs:surface");
        assert_eq!(TerminalKind::Volume.output_name("mtl"), "outputs:mtl:volume");
        assert_eq!(TerminalKind::Displacement.output_name("ri"), "outputs:ri:displacement");
    }

    #[test]
    fn test_split_output_name() {
        assert_eq!(TerminalKind::split_output_name("outputs:surface"), Some((TerminalKind::Surface, "")));
        assert_eq!(
            TerminalKind::split_output_name("outputs:mtl:displacement"),
            Some((TerminalKind::Displacement, "mtl"))
        );
        assert_eq!(TerminalKind::split_output_name("outputs:mtl:diffuse"), None);
        assert_eq!(TerminalKind::split_output_name("inputs:surface"), None);
        for kind in TerminalKind::ALL {
            let name = kind.output_name("glslfx");
            assert_eq!(TerminalKind::split_output_name(&name), Some((kind, "glslfx")));
        }
    }

    #[test]
    fn test_parse() {
        assert_eq!("volume".parse::<TerminalKind>().unwrap(), TerminalKind::Volume);
        assert!("bogus".parse::<TerminalKind>().unwrap_err().is_invalid_argument());
    }
}
