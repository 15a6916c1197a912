pub(crate) mod backend;
pub(crate) mod blend;
pub(crate) mod cpu;
pub(crate) mod decode;
