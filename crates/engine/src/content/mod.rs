mod compiler;
mod database;

pub use compiler::{
    compile_kind_catalog, load_kind_catalog, ContentCompileError, ContentErrorCode,
    SourceLocation,
};
pub use database::{Buildable, FloatRange, KindCatalog, KindDef, WanderDef};
