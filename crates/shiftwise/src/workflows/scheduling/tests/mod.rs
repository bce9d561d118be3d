mod common;

mod conflicts;
mod directory;
mod routing;
