use std::collections::VecDeque;

use super::StateMachine;

/// A two wheel speed vector for the differential drive, left wheel first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotorCommand(pub [f64; 2]);

impl MotorCommand {
    /// Wheel speeds for straight line motion. The wheels are mounted mirrored, so the left one
    /// spins the other way.
    pub fn linear(velocity: f64) -> Self {
        Self([-velocity, velocity])
    }

    /// Wheel speeds for rotation in place.
    pub fn angular(omega: f64) -> Self {
        Self([omega, omega])
    }

    pub fn wheels(&self) -> [f64; 2] {
        self.0
    }
}

/// Debounces velocity targets and queues the motor commands that actually change something.
pub struct ActuationMachine {
    velocity: f64,
    omega: f64,
    pending_commands: VecDeque<MotorCommand>,
}

impl ActuationMachine {
    pub fn new() -> Self {
        Self {
            velocity: 0.0,
            omega: 0.0,
            pending_commands: VecDeque::new(),
        }
    }

    /// The last linear velocity that was commanded.
    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    /// The last angular velocity that was commanded.
    pub fn omega(&self) -> f64 {
        self.omega
    }

    #[cfg(test)]
    fn pending_count(&self) -> usize {
        self.pending_commands.len()
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.pending_commands.is_empty()
    }

    fn set_velocity(&mut self, target: f64) {
        if target != self.velocity {
            self.pending_commands.push_back(MotorCommand::linear(target));
            self.velocity = target;
        }
    }

    fn set_omega(&mut self, target: f64) {
        if target != self.omega {
            self.pending_commands.push_back(MotorCommand::angular(target));
            self.omega = target;
        }
    }

    fn dequeue(&mut self) -> Option<MotorCommand> {
        self.pending_commands.pop_front()
    }
}

impl Default for ActuationMachine {
    fn default() -> Self {
        Self::new()
    }
}

pub enum ActuationInput {
    SetVelocity(f64),
    SetOmega(f64),
}

pub enum ActuationOutput {
    Command(MotorCommand),
}

impl StateMachine for ActuationMachine {
    type Input = ActuationInput;
    type Output = ActuationOutput;

    fn process_input(&mut self, input: Self::Input) {
        match input {
            ActuationInput::SetVelocity(target) => self.set_velocity(target),
            ActuationInput::SetOmega(target) => self.set_omega(target),
        }
    }

    fn poll_output(&mut self) -> Option<Self::Output> {
        self.dequeue().map(ActuationOutput::Command)
    }
}
