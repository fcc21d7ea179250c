/// Type checker module
/// Walks a parsed tree once and annotates every node with its resolved type
pub mod type_checker;
