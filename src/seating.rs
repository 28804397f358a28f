//! Player seats around the table and the viewing user.

#[cfg(test)]
#[path = "seating_test.rs"]
mod seating_test;

use serde::{Deserialize, Serialize};

/// One player slot. Empty while `user` is `None`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Seat {
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

impl Seat {
    #[must_use]
    pub fn taken_by(user: impl Into<String>) -> Self {
        Self { user: Some(user.into()), color: None }
    }

    #[must_use]
    pub fn is_filled(&self) -> bool {
        self.user.is_some()
    }
}

/// Seats in registration order plus the user this session renders for.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Seating {
    seats: Vec<Seat>,
    own_user: Option<String>,
}

impl Seating {
    #[must_use]
    pub fn new(seats: Vec<Seat>, own_user: Option<String>) -> Self {
        Self { seats, own_user }
    }

    #[must_use]
    pub fn seats(&self) -> &[Seat] {
        &self.seats
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.seats.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    #[must_use]
    pub fn is_filled(&self, seat: usize) -> bool {
        self.seats.get(seat).is_some_and(Seat::is_filled)
    }

    #[must_use]
    pub fn filled_count(&self) -> usize {
        self.seats.iter().filter(|s| s.is_filled()).count()
    }

    /// Rank of a filled seat among the filled seats, in registration order.
    #[must_use]
    pub fn rank(&self, seat: usize) -> Option<usize> {
        if !self.is_filled(seat) {
            return None;
        }
        Some(self.seats[..seat].iter().filter(|s| s.is_filled()).count())
    }

    /// Rank of the viewing user's seat. Spectators view from rank 0.
    #[must_use]
    pub fn own_rank(&self) -> usize {
        let Some(own) = self.own_user.as_deref() else {
            return 0;
        };
        self.seats
            .iter()
            .position(|s| s.user.as_deref() == Some(own))
            .and_then(|i| self.rank(i))
            .unwrap_or(0)
    }
}

/// Yaw offset, in degrees, of the seat at `rank` as seen from `own_rank`.
///
/// The viewer's own seat always lands at 0°, facing the camera.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn seat_rotation_deg(rank: usize, own_rank: usize, filled: usize) -> f64 {
    if filled == 0 {
        return 0.0;
    }
    let position = (rank + filled - own_rank % filled) % filled;
    position as f64 * 360.0 / filled as f64
}
