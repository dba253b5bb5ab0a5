//! Shading-language target selection.
//!
//! A [`ShaderTarget`] decides the `#version` line, the ES precision statement
//! and which keyword set (legacy `attribute`/`varying`/`gl_FragColor` or modern
//! `in`/`out`) every node uses. Nodes never look at the version themselves;
//! they read [`Keywords`] from the build context.
//!
//! # Example
//!
//! ```ignore
//! let target = ShaderTarget::gles(300).float_precision(Precision::Medium);
//! assert_eq!(target.version_line(), "#version 300 es\n");
//! ```

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::types::{GlslType, Stage};

/// Default float precision for ES fragment and vertex stages.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Precision {
    Low,
    Medium,
    #[default]
    High,
}

impl Precision {
    pub fn keyword(self) -> &'static str {
        match self {
            Precision::Low => "lowp",
            Precision::Medium => "mediump",
            Precision::High => "highp",
        }
    }
}

/// Version, profile and flavour of the generated GLSL.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ShaderTarget {
    pub version: u32,
    /// Desktop profile appended to the version line (`core`, `compatibility`).
    pub profile: Option<String>,
    pub es: bool,
    pub float_precision: Precision,
}

impl Default for ShaderTarget {
    fn default() -> Self {
        Self::gl_core(330)
    }
}

impl ShaderTarget {
    /// Desktop GLSL without a profile, e.g. `gl(110)` or `gl(120)`.
    pub fn gl(version: u32) -> Self {
        Self {
            version,
            profile: None,
            es: false,
            float_precision: Precision::High,
        }
    }

    /// Desktop GLSL with the `core` profile.
    pub fn gl_core(version: u32) -> Self {
        Self::gl(version).profile("core")
    }

    /// GLSL ES; versions below 300 produce `#version 100`.
    pub fn gles(version: u32) -> Self {
        Self {
            version,
            profile: None,
            es: true,
            float_precision: Precision::High,
        }
    }

    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    pub fn es(mut self, es: bool) -> Self {
        self.es = es;
        self
    }

    pub fn float_precision(mut self, precision: Precision) -> Self {
        self.float_precision = precision;
        self
    }

    /// True when the target uses `in`/`out` and `texture()` instead of the
    /// GLSL 1.x keywords.
    pub fn is_modern(&self) -> bool {
        if self.es {
            self.version >= 300
        } else {
            self.version >= 130
        }
    }

    pub fn keywords(&self) -> Keywords {
        if self.is_modern() {
            Keywords::MODERN
        } else {
            Keywords::LEGACY
        }
    }

    pub fn version_line(&self) -> String {
        if self.es {
            if self.version >= 300 {
                "#version 300 es\n".to_string()
            } else {
                "#version 100\n".to_string()
            }
        } else {
            match self.profile.as_deref() {
                Some(profile) if !profile.is_empty() => {
                    format!("#version {} {}\n", self.version, profile)
                }
                _ => format!("#version {}\n", self.version),
            }
        }
    }

    /// Texture lookup function for the given sampler type.
    pub fn texture_fn(&self, sampler: GlslType) -> &'static str {
        if self.is_modern() {
            return "texture";
        }
        match sampler {
            GlslType::Sampler3D => "texture3D",
            GlslType::SamplerCube => "textureCube",
            _ => "texture2D",
        }
    }

    /// Everything emitted ahead of a stage's declarations.
    pub fn preamble(&self, stage: Stage) -> String {
        let mut out = self.version_line();
        if self.es {
            // String writes cannot fail
            let _ = writeln!(out, "precision {} float;", self.float_precision.keyword());
        }
        if stage == Stage::Fragment && self.is_modern() {
            let _ = writeln!(out, "out vec4 {};", Keywords::MODERN.frag_color);
        }
        out
    }
}

/// Stage-interface keywords for one target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Keywords {
    /// Vertex-stage input qualifier.
    pub attribute: &'static str,
    pub varying_out: &'static str,
    pub varying_in: &'static str,
    /// Name written to for the fragment colour.
    pub frag_color: &'static str,
}

impl Keywords {
    pub const LEGACY: Keywords = Keywords {
        attribute: "attribute",
        varying_out: "varying",
        varying_in: "varying",
        frag_color: "gl_FragColor",
    };

    pub const MODERN: Keywords = Keywords {
        attribute: "in",
        varying_out: "out",
        varying_in: "in",
        frag_color: "fragColor",
    };
}
