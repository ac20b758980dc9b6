pub mod actuation;
pub mod pose;

/// The [`StateMachine`] trait provides calling semantics for the pure bookkeeping machines that
/// sit behind the shared vehicle handles.
///
/// # Functionality
/// A machine is fed through [`process_input`](StateMachine::process_input) and drained through
/// [`poll_output`](StateMachine::poll_output). Inputs and outputs are grouped under the associated
/// [`Input`](StateMachine::Input) and [`Output`](StateMachine::Output) types, usually an enum when
/// there is more than one kind and a struct otherwise.
///
/// Keeping the dispatch in this trait lets the machine itself stay focused on the bookkeeping (the
/// latest pose, the last commanded motor speeds) while the owning container decides how the
/// machine is shared and where its output goes.
///
/// # Invariants
/// Implementors *must* be pure: the result of feeding a sequence of inputs depends only on that
/// sequence. This is what allows a recorded trace to be replayed and what allows the containers in
/// [`vehicle`](crate::vehicle) to hold the machine under a short lived lock.
///
/// ## No Interior Mutability
/// State is modified only through `&mut self`. No [`std::cell`] containers, no [`std::sync`]
/// locks and no reference counted sharing inside the machine. Containers add the locking.
///
/// ## No IO
/// No sockets, files or tracks. A machine that produces motor commands queues them as output;
/// publishing them is the container's job, done after the machine's lock is released.
///
/// ### No System Time
/// Timestamps are part of the input. The pose machine takes the clock from the stamp of the
/// observation batch, never from [`std::time::Instant::now`].
///
/// ## No Blocking
/// Processing an input must complete in bounded time so that a reader holding the container lock
/// can never stall the asynchronous feed writing into it, and the other way around.
///
/// # Side Effects
/// Logging through `tracing` is allowed as long as the machine's logic never depends on it.
///
/// # Example
/// ```ignore
/// let mut machine = ActuationMachine::new();
///
/// machine.process_input(ActuationInput::SetVelocity(1.0));
/// machine.process_input(ActuationInput::SetVelocity(1.0));
///
/// // Only the first write changed the commanded speed.
/// assert!(machine.poll_output().is_some());
/// assert!(machine.poll_output().is_none());
/// ```
pub trait StateMachine {
    /// The type of input that is [processed](StateMachine::process_input) by the state machine.
    type Input;
    /// The type of output that is [polled](StateMachine::poll_output) by the state machine.
    type Output;

    /// Process the provided `input` into the state machine.
    fn process_input(&mut self, input: Self::Input);

    /// Poll the state machine for output, returning the first available output if present.
    fn poll_output(&mut self) -> Option<Self::Output>;
}
