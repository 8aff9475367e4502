/// Player intent for one frame, sampled by the front end.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Input {
    /// Aim direction in radians.
    pub aim: f32,
    /// Launch along `aim`; only honoured while stationary.
    pub jump: bool,
    pub fire: bool,
}

impl Input {
    pub fn aim(aim: f32) -> Self {
        Self {
            aim,
            ..Self::default()
        }
    }

    pub fn with_jump(mut self) -> Self {
        self.jump = true;
        self
    }

    pub fn with_fire(mut self) -> Self {
        self.fire = true;
        self
    }
}
