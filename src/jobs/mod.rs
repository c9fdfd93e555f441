pub(crate) mod book;
pub(crate) mod kind;
pub(crate) mod orchestrator;
pub(crate) mod task;
pub(crate) mod transport;
