// LCM - Shared cycle length of the active tracks
// Every pattern is stretched to the least common multiple of the active meters

use super::track::Track;

pub fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Least common multiple, `None` on overflow
pub fn checked_lcm(a: u64, b: u64) -> Option<u64> {
    if a == 0 || b == 0 {
        return Some(0);
    }
    (a / gcd(a, b)).checked_mul(b)
}

/// Cycle length for a set of meters
///
/// An empty set gives 1. Returns `None` when the result would exceed `max_length`.
pub fn cycle_length<I>(beat_numbers: I, max_length: usize) -> Option<usize>
where
    I: IntoIterator<Item = u32>,
{
    let mut length: u64 = 1;
    for beat_number in beat_numbers {
        length = checked_lcm(length, u64::from(beat_number.max(1)))?;
        if length > max_length as u64 {
            return None;
        }
    }
    usize::try_from(length).ok()
}

/// Cycle length of the currently active tracks
pub fn active_cycle_length(tracks: &[Track], max_length: usize) -> Option<usize> {
    cycle_length(
        tracks.iter().filter(|t| t.is_active).map(|t| t.beat_number),
        max_length,
    )
}

/// Regenerates every track for a new cycle length
/// Manual edits on active tracks are discarded
pub fn rebuild(tracks: &mut [Track], cycle_length: usize) {
    for track in tracks.iter_mut() {
        track.regenerate(cycle_length);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::timbre::Timbre;

    #[test]
    fn test_gcd() {
        assert_eq!(gcd(12, 8), 4);
        assert_eq!(gcd(7, 3), 1);
        assert_eq!(gcd(5, 0), 5);
    }

    #[test]
    fn test_cycle_length() {
        assert_eq!(cycle_length([3, 4], 1024), Some(12));
        assert_eq!(cycle_length([4, 4, 2], 1024), Some(4));
        assert_eq!(cycle_length([5, 3, 4], 1024), Some(60));
        assert_eq!(cycle_length(std::iter::empty(), 1024), Some(1));
    }

    #[test]
    fn test_cycle_length_limit() {
        assert_eq!(cycle_length([61, 59, 53], 100_000), None);
        assert_eq!(cycle_length([61, 59], 100_000), Some(3599));
    }

    #[test]
    fn test_active_cycle_length_ignores_inactive() {
        let tracks = vec![
            Track::new(0, 3, true, Timbre::Cardboard),
            Track::new(1, 4, true, Timbre::Plastic),
            Track::new(2, 5, false, Timbre::Wood),
        ];
        assert_eq!(active_cycle_length(&tracks, 1024), Some(12));
    }

    #[test]
    fn test_rebuild_resizes_all_tracks() {
        let mut tracks = vec![
            Track::new(0, 3, true, Timbre::Cardboard),
            Track::new(1, 5, false, Timbre::Plastic),
        ];
        rebuild(&mut tracks, 6);
        assert!(tracks.iter().all(|t| t.beats.len() == 6));
        assert_eq!(tracks[0].on_count(), 2);
        assert_eq!(tracks[1].on_count(), 0);
    }
}
