use std::path::Path;

use rand::Rng;

use crate::app::{EntityKind, Rgb};

use super::compiler::compile_kind_catalog;

const BUILTIN_KINDS_XML: &str = include_str!("builtin_kinds.xml");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Buildable {
    Outdoor,
    Indoor,
    Both,
    Never,
}

impl Buildable {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "outdoor" => Some(Self::Outdoor),
            "indoor" => Some(Self::Indoor),
            "both" => Some(Self::Both),
            "none" => Some(Self::Never),
            _ => None,
        }
    }

    pub fn allows(self, indoors: bool) -> bool {
        match self {
            Self::Outdoor => !indoors,
            Self::Indoor => indoors,
            Self::Both => true,
            Self::Never => false,
        }
    }
}

/// Inclusive `[min, max]` range for cosmetic sampling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatRange {
    pub min: f32,
    pub max: f32,
}

impl FloatRange {
    pub const fn fixed(value: f32) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        if self.max <= self.min {
            return self.min;
        }
        rng.gen_range(self.min..=self.max)
    }

    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WanderDef {
    pub move_speed: f32,
    pub radius: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KindDef {
    pub kind: EntityKind,
    pub label: String,
    pub interaction_radius: f32,
    pub removable: bool,
    pub buildable: Buildable,
    pub height: FloatRange,
    pub radius: FloatRange,
    pub noise: FloatRange,
    pub color: Rgb,
    pub wander: Option<WanderDef>,
}

/// Tuning for every [`EntityKind`]; always complete.
#[derive(Debug, Clone, PartialEq)]
pub struct KindCatalog {
    defs: Vec<KindDef>,
}

impl KindCatalog {
    /// `defs` must hold exactly one entry per kind; the compiler guarantees this.
    pub(crate) fn from_complete_defs(mut defs: Vec<KindDef>) -> Self {
        defs.sort_by_key(|def| def.kind.index());
        debug_assert_eq!(defs.len(), EntityKind::ALL.len());
        Self { defs }
    }

    pub fn builtin() -> Self {
        compile_kind_catalog(BUILTIN_KINDS_XML, Path::new("<builtin>/kinds.xml"))
            .expect("builtin kind catalog is valid")
    }

    pub fn def(&self, kind: EntityKind) -> &KindDef {
        &self.defs[kind.index()]
    }

    pub fn defs(&self) -> &[KindDef] {
        &self.defs
    }
}

impl Default for KindCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
