use serde::Serialize;

/// Visual state of the agent. There is no skeleton; backends pick a look per pose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Pose {
    Idle,
    Walk,
}

pub struct AnimatorTransitionState {
    pub from: Pose,
    pub to: Pose,
    /// seconds since this transition started
    pub elapsed: f32,
}

pub enum AnimatorState {
    State(Pose),
    Transition(AnimatorTransitionState),
}

#[derive(Debug, PartialEq, Eq)]
pub enum AnimatorError {
    AttemptedTransitionWhilePreviousTransitionStillPlaying,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PoseSnapshot {
    pub from: Pose,
    pub to: Pose,
    /// 0 is fully `from`, 1 is fully `to`
    pub weight: f32,
}

pub struct Animator {
    current_state: AnimatorState,
    blend_time: f32,
}

impl Animator {
    pub fn new(start: Pose, blend_time: f32) -> Self {
        Self {
            current_state: AnimatorState::State(start),
            blend_time: blend_time.max(0.0),
        }
    }

    pub fn get_current_state(&self) -> &AnimatorState {
        &self.current_state
    }

    /// Pose the agent is in or heading toward.
    pub fn target_pose(&self) -> Pose {
        match &self.current_state {
            AnimatorState::State(pose) => *pose,
            AnimatorState::Transition(transition) => transition.to,
        }
    }

    /// Requesting the current pose is a no-op.
    pub fn transition(&mut self, to: Pose) -> Result<(), AnimatorError> {
        let from = match &self.current_state {
            AnimatorState::State(pose) => Ok(*pose),
            AnimatorState::Transition(transition) if transition.to == to => return Ok(()),
            _ => Err(AnimatorError::AttemptedTransitionWhilePreviousTransitionStillPlaying),
        }?;
        if from == to {
            return Ok(());
        }
        self.current_state = AnimatorState::Transition(AnimatorTransitionState {
            from,
            to,
            elapsed: 0.0,
        });
        Ok(())
    }

    pub fn update(&mut self, dt: f32) {
        let finished = match &mut self.current_state {
            AnimatorState::State(_) => None,
            AnimatorState::Transition(transition) => {
                transition.elapsed += dt;
                (transition.elapsed >= self.blend_time).then_some(transition.to)
            }
        };
        if let Some(pose) = finished {
            self.current_state = AnimatorState::State(pose);
        }
    }

    pub fn build_snapshot(&self) -> PoseSnapshot {
        match &self.current_state {
            AnimatorState::State(pose) => PoseSnapshot {
                from: *pose,
                to: *pose,
                weight: 1.0,
            },
            AnimatorState::Transition(transition) => PoseSnapshot {
                from: transition.from,
                to: transition.to,
                weight: if self.blend_time > 0.0 {
                    (transition.elapsed / self.blend_time).min(1.0)
                } else {
                    1.0
                },
            },
        }
    }
}
