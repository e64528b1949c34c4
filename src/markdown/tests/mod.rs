mod helpers;
mod streaming;
mod structure;
