// Per-context bound state: named values that shape later queries and dispatches.
use crate::core::error::{Error, ErrorKind};
use crate::core::flags::WindingOrder;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StateKey {
    FaceWindingOrder,
    GeneralPositionConstant,
    GeneralPositionAttempts,
}

impl StateKey {
    pub fn from_raw(raw: u32) -> Result<Self, Error> {
        match raw {
            1 => Ok(StateKey::FaceWindingOrder),
            2 => Ok(StateKey::GeneralPositionConstant),
            3 => Ok(StateKey::GeneralPositionAttempts),
            _ => Err(Error::new(ErrorKind::InvalidArgument)
                .with_message(format!("unknown bound-state key: {raw}"))),
        }
    }

    pub fn value_size(self) -> usize {
        match self {
            StateKey::FaceWindingOrder | StateKey::GeneralPositionAttempts => 4,
            StateKey::GeneralPositionConstant => 8,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundState {
    pub winding_order: WindingOrder,
    pub general_position_constant: f64,
    pub general_position_attempts: u32,
}

impl BoundState {
    pub fn new(general_position_constant: f64, general_position_attempts: u32) -> Self {
        Self {
            winding_order: WindingOrder::AsGiven,
            general_position_constant,
            general_position_attempts,
        }
    }

    /// Validates and applies a native-endian encoded value.
    pub fn bind(&mut self, key: StateKey, value: &[u8]) -> Result<(), Error> {
        if value.len() != key.value_size() {
            return Err(Error::new(ErrorKind::InvalidArgument).with_message(format!(
                "{key:?} expects {} bytes, got {}",
                key.value_size(),
                value.len()
            )));
        }
        match key {
            StateKey::FaceWindingOrder => {
                self.winding_order = WindingOrder::from_raw(read_u32(value))?;
            }
            StateKey::GeneralPositionConstant => {
                let constant = f64::from_ne_bytes(read_array(value));
                if !constant.is_finite() || constant <= 0.0 {
                    return Err(Error::new(ErrorKind::InvalidArgument)
                        .with_message("general-position constant must be finite and positive"));
                }
                self.general_position_constant = constant;
            }
            StateKey::GeneralPositionAttempts => {
                let attempts = read_u32(value);
                if attempts == 0 {
                    return Err(Error::new(ErrorKind::InvalidArgument)
                        .with_message("general-position attempts must be at least 1"));
                }
                self.general_position_attempts = attempts;
            }
        }
        Ok(())
    }

    pub fn encode(&self, key: StateKey) -> Vec<u8> {
        match key {
            StateKey::FaceWindingOrder => (self.winding_order as u32).to_ne_bytes().to_vec(),
            StateKey::GeneralPositionConstant => self.general_position_constant.to_ne_bytes().to_vec(),
            StateKey::GeneralPositionAttempts => self.general_position_attempts.to_ne_bytes().to_vec(),
        }
    }
}

fn read_array<const N: usize>(value: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&value[..N]);
    out
}

fn read_u32(value: &[u8]) -> u32 {
    u32::from_ne_bytes(read_array(value))
}

/// Keys readable through the context-level query.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InfoKey {
    Flags,
    WorkerThreads,
    State(StateKey),
}

impl InfoKey {
    pub fn from_raw(raw: u32) -> Result<Self, Error> {
        match raw {
            0x100 => Ok(InfoKey::Flags),
            0x101 => Ok(InfoKey::WorkerThreads),
            _ => StateKey::from_raw(raw).map(InfoKey::State),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BoundState, InfoKey, StateKey};
    use crate::core::error::ErrorKind;
    use crate::core::flags::WindingOrder;

    #[test]
    fn winding_order_binds_and_encodes() {
        let mut state = BoundState::new(1e-4, 4);
        state
            .bind(StateKey::FaceWindingOrder, &1u32.to_ne_bytes())
            .expect("bind");
        assert_eq!(state.winding_order, WindingOrder::Reversed);
        assert_eq!(state.encode(StateKey::FaceWindingOrder), 1u32.to_ne_bytes().to_vec());
    }

    #[test]
    fn rejects_out_of_range_values() {
        let mut state = BoundState::new(1e-4, 4);
        let err = state
            .bind(StateKey::FaceWindingOrder, &9u32.to_ne_bytes())
            .expect_err("range");
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        let err = state
            .bind(StateKey::GeneralPositionConstant, &(-1.0f64).to_ne_bytes())
            .expect_err("negative");
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        let err = state
            .bind(StateKey::GeneralPositionAttempts, &0u32.to_ne_bytes())
            .expect_err("zero");
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(state, BoundState::new(1e-4, 4));
    }

    #[test]
    fn rejects_wrong_value_size() {
        let mut state = BoundState::new(1e-4, 4);
        let err = state
            .bind(StateKey::GeneralPositionConstant, &1u32.to_ne_bytes())
            .expect_err("size");
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn info_keys_cover_state_keys() {
        assert_eq!(InfoKey::from_raw(0x100).expect("flags"), InfoKey::Flags);
        assert_eq!(
            InfoKey::from_raw(2).expect("gp"),
            InfoKey::State(StateKey::GeneralPositionConstant)
        );
        assert_eq!(
            InfoKey::from_raw(77).expect_err("unknown").kind(),
            ErrorKind::InvalidArgument
        );
    }
}
