mod config;
mod conflicts;
mod execute;
mod fixtures;
mod preconditions;
mod preview;
mod scan;
