pub(crate) mod entities;
pub(crate) mod patterns;
pub(crate) mod text;
pub(crate) mod uri;
