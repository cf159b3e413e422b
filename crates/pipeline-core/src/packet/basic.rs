use super::interface::write_values;
use crate::Packet;
use core::fmt;

/// A [`Packet`] backed by a `Vec<i64>`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct BasicPacket {
    values: Vec<i64>,
}

impl Packet for BasicPacket {
    fn zeroed(len: usize) -> Self {
        Self {
            values: vec![0; len],
        }
    }

    fn from_values(values: Vec<i64>) -> Self {
        Self { values }
    }

    fn into_values(self) -> Vec<i64> {
        self.values
    }

    fn values(&self) -> &[i64] {
        &self.values
    }

    fn values_mut(&mut self) -> &mut [i64] {
        &mut self.values
    }
}

impl From<Vec<i64>> for BasicPacket {
    fn from(values: Vec<i64>) -> Self {
        Self::from_values(values)
    }
}

impl From<&[i64]> for BasicPacket {
    fn from(values: &[i64]) -> Self {
        Self::from_values(values.to_vec())
    }
}

impl fmt::Display for BasicPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_values(f, &self.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn packet_from_values_keeps_elements() {
        for input in [vec![], vec![0], vec![0, 1]] {
            let packet = BasicPacket::from(input.clone());
            assert_eq!(packet.values(), input.as_slice(), "packet {packet}");
            assert_eq!(packet.len(), input.len());
        }
    }

    #[test]
    fn packet_from_size_is_zero_filled() {
        for size in [0, 1, 10] {
            let packet = BasicPacket::zeroed(size);
            assert_eq!(packet.len(), size, "packet {packet}");
            assert!(packet.values().iter().all(|&v| v == 0));
        }
        assert!(BasicPacket::zeroed(0).is_empty());
    }

    #[test]
    fn renders_canonical_form() {
        assert_eq!(BasicPacket::zeroed(0).to_string(), "[]");
        assert_eq!(BasicPacket::from(vec![7]).to_string(), "[7]");
        assert_eq!(BasicPacket::from(vec![3, -1, 12]).to_string(), "[3,-1,12]");
    }

    #[test]
    fn get_and_set_respect_bounds() {
        let mut packet = BasicPacket::zeroed(3);
        packet.set(1, 42).unwrap();
        assert_eq!(packet.get(1), Some(42));
        assert_eq!(packet.get(3), None);
        assert_eq!(
            packet.set(3, 1),
            Err(Error::IndexOutOfBounds { index: 3, len: 3 })
        );
        assert_eq!(packet.to_string(), "[0,42,0]");
    }

    #[test]
    fn slice_from_handles_both_directions() {
        let packet = BasicPacket::from(vec![1, 2, 3, 4, 5]);
        assert_eq!(packet.slice_from(0).unwrap(), &[1, 2, 3, 4, 5]);
        assert_eq!(packet.slice_from(2).unwrap(), &[3, 4, 5]);
        assert_eq!(packet.slice_from(-2).unwrap(), &[4, 5]);
        assert_eq!(packet.slice_from(-5).unwrap(), &[1, 2, 3, 4, 5]);
        assert_eq!(packet.slice_from(5).unwrap(), &[] as &[i64]);
        assert!(packet.slice_from(6).is_err());
        assert!(packet.slice_from(-6).is_err());
    }

    #[test]
    fn slice_range_is_half_open() {
        let packet = BasicPacket::from(vec![1, 2, 3, 4, 5]);
        assert_eq!(packet.slice_range(1, 3).unwrap(), &[2, 3]);
        assert_eq!(packet.slice_range(0, 0).unwrap(), &[] as &[i64]);
        assert_eq!(packet.slice_range(-3, -1).unwrap(), &[3, 4]);
        assert_eq!(
            packet.slice_range(3, 1),
            Err(Error::SliceOutOfBounds {
                start: 3,
                end: 1,
                len: 5
            })
        );
        assert!(packet.slice_range(0, 6).is_err());
    }
}
