/// A network-reachability signal, pushed in from outside the crate. The
/// supervisor reacts to transitions under its own lock rather than
/// subscribing to an external monitor type directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reachability {
    Satisfied,
    Unsatisfied,
}
