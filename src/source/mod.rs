pub(crate) mod fetch;
pub(crate) mod reference;
