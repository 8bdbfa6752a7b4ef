//! Logical Block Address (LBA), Logical Sector Number (LSN) and Minute-Second-Frame (MSF)
//! newtypes shared by the transport, command and tree layers.

use std::fmt;
use std::marker::PhantomData;

use derive_more::{Add, AddAssign, Div, DivAssign, Into, Mul, MulAssign, Neg, Sub, SubAssign};

use crate::core::constants::{FRAMES_PER_MINUTE, FRAMES_PER_SECOND, PREGAP_OFFSET};

/// Marker trait for the address newtypes (`Lba`, `Lsn`, `Msf`) so generic code such as
/// `TOCAddr` can bound over "any of our address representations" without pulling in the
/// concrete arithmetic derives.
pub trait Address: Sized + Copy {}

/// Generic "value out of the representable range" error, parameterized by the address type
/// that rejected it so call sites get a distinct error per newtype without duplicating the
/// variant.
pub struct AddressError<A>(PhantomData<fn() -> A>);

impl<A> AddressError<A> {
    fn new() -> Self {
        Self(PhantomData)
    }
}

impl<A> fmt::Debug for AddressError<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AddressError(out of range)")
    }
}

impl<A> fmt::Display for AddressError<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("address out of range")
    }
}

impl<A> std::error::Error for AddressError<A> {}

impl<A> Clone for AddressError<A> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<A> Copy for AddressError<A> {}

/// Newtype representing a Logical Block Address (LBA).
///
/// An LBA is a block index that includes the disc pregap. This means that LBA index 0
/// corresponds to the block at 00:00:00 in the potentially unreadable region depending on
/// whether or not the drive can read hidden track one audio (HTOA).
#[repr(transparent)]
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Into,
    Add,
    AddAssign,
    Sub,
    SubAssign,
    Mul,
    MulAssign,
    Div,
    DivAssign,
    Neg,
)]
pub struct Lba(i32);

impl Address for Lba {}

impl Lba {
    /// The maximum representable Logical Block Address.
    ///
    /// 100 minutes * 60s * 75 frames/s = 450,000. Conservative relative to libcdio's own
    /// constant, but nothing the growth bridge or drive lifecycle engine ever records an
    /// address this high anyway.
    pub const MAX: Lba = Lba(450_000);

    /// The minimum representable Logical Block Address.
    pub const MIN: Lba = Lba(-450_000);

    /// The logical block at address 0.
    pub const ZERO: Lba = Lba(0);

    pub const fn raw(self) -> i32 {
        self.0
    }
}

impl TryFrom<i32> for Lba {
    type Error = AddressError<Self>;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        let lba = Self(value);
        if !(Self::MIN..=Self::MAX).contains(&lba) {
            return Err(AddressError::new());
        }
        Ok(lba)
    }
}

impl From<Lsn> for Lba {
    fn from(value: Lsn) -> Self {
        Self(value.raw() + i32::from(PREGAP_OFFSET))
    }
}

impl TryFrom<Msf> for Lba {
    type Error = AddressError<Self>;

    fn try_from(value: Msf) -> Result<Self, Self::Error> {
        let Msf(m, s, f) = value;

        let m: i32 = i32::from(m) * i32::from(FRAMES_PER_MINUTE);
        let s: i32 = i32::from(s) * i32::from(FRAMES_PER_SECOND);
        let f: i32 = f.into();

        Self::try_from(m + s + f)
    }
}

/// Newtype representing a Logical Sector Number (LSN).
///
/// An LSN is a block index that does not include the disc pregap. LSN index 0 corresponds to
/// the first playable frame of audio in a CD-DA, at 00:02:00.
#[repr(transparent)]
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Into,
    Add,
    AddAssign,
    Sub,
    SubAssign,
    Mul,
    MulAssign,
    Div,
    DivAssign,
    Neg,
)]
pub struct Lsn(i32);

impl Address for Lsn {}

impl Lsn {
    pub const MAX: Lsn = Lsn(Lba::MAX.0 - PREGAP_OFFSET as i32);
    pub const MIN: Lsn = Lsn(Lba::MIN.0 - PREGAP_OFFSET as i32);
    pub const ZERO: Lsn = Lsn(0);

    pub const fn raw(self) -> i32 {
        self.0
    }
}

impl TryFrom<i32> for Lsn {
    type Error = AddressError<Self>;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        let lsn = Self(value);
        if !(Self::MIN..=Self::MAX).contains(&lsn) {
            return Err(AddressError::new());
        }
        Ok(lsn)
    }
}

impl From<Lba> for Lsn {
    fn from(value: Lba) -> Self {
        Self(value.raw() - i32::from(PREGAP_OFFSET))
    }
}

impl TryFrom<Msf> for Lsn {
    type Error = AddressError<Self>;

    fn try_from(value: Msf) -> Result<Self, Self::Error> {
        let lba = Lba::try_from(value)?;
        Ok(Self::from(lba))
    }
}

/// Minute, Second, Frame format: `MM:SS:FF`, indexed at 75 frames per second.
///
/// Stored in binary rather than libcdio's BCD convention; there is no remaining VCD-era reason
/// to keep the BCD packing.
#[derive(Clone, Copy, Debug)]
pub struct Msf(u8, u8, u8);

impl Address for Msf {}

impl Msf {
    /// Construct an MSF value without checking that it round-trips to a valid LBA.
    pub const fn new_unchecked(m: u8, s: u8, f: u8) -> Self {
        Msf(m, s, f)
    }

    /// Construct an MSF value, rejecting one that would address outside `Lba::MIN..=Lba::MAX`.
    pub fn new(m: u8, s: u8, f: u8) -> Result<Self, AddressError<Self>> {
        let candidate = Msf(m, s, f);
        Lba::try_from(candidate).map_err(|_| AddressError::new())?;
        Ok(candidate)
    }
}

impl fmt::Display for Msf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.0, self.1, self.2)
    }
}

impl From<Lba> for Msf {
    /* Adapted from libcdio, itself adapted from cdparanoia, which claims to follow the MMC-3
     * spec directly. */
    fn from(value: Lba) -> Self {
        let mut value = if value >= Lba::ZERO {
            value.raw()
        } else {
            (value + Lba::MAX).raw()
        };

        let m = value / i32::from(FRAMES_PER_MINUTE);
        value -= m * i32::from(FRAMES_PER_MINUTE);
        let s = value / i32::from(FRAMES_PER_SECOND);
        value -= s * i32::from(FRAMES_PER_SECOND);
        let f = value;

        // Given a valid LBA, truncation here is mathematically safe.
        Msf(m as u8, s as u8, f as u8)
    }
}

impl From<Lsn> for Msf {
    fn from(value: Lsn) -> Self {
        Msf::from(Lba::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lba_msf_round_trip() {
        let lba = Lba::try_from(12_345).unwrap();
        let msf = Msf::from(lba);
        let back = Lba::try_from(msf).unwrap();
        assert_eq!(lba, back);
    }

    #[test]
    fn lba_out_of_range_rejected() {
        assert!(Lba::try_from(i32::from(Lba::MAX.raw()) + 1).is_err());
    }

    #[test]
    fn msf_new_rejects_bogus_seconds() {
        // 99 minutes, 99 seconds, 99 frames overflows Lba::MAX by a wide margin.
        assert!(Msf::new(99, 99, 99).is_err());
    }

    #[test]
    fn lsn_pregap_offset() {
        let lba = Lba::ZERO;
        let lsn = Lsn::from(lba);
        assert_eq!(lsn.raw(), -i32::from(PREGAP_OFFSET));
    }
}
