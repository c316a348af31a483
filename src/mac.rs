use core::fmt;
use core::str::FromStr;

pub const ETH_ALEN: usize = 6;

#[derive(Copy, Clone, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MacAddress([u8; ETH_ALEN]);

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MacParseError {
    /// Not six groups, or the groups mix `:` and `-`.
    BadLength,
    BadDigit,
}

impl MacAddress {
    pub const ZERO: MacAddress = MacAddress([0; ETH_ALEN]);

    pub const fn new(octets: [u8; ETH_ALEN]) -> Self {
        Self(octets)
    }

    pub const fn octets(&self) -> [u8; ETH_ALEN] {
        self.0
    }

    pub const fn is_zero(&self) -> bool {
        let o = self.0;
        o[0] | o[1] | o[2] | o[3] | o[4] | o[5] == 0
    }

    pub const fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }

    /// Usable as a station address: neither multicast nor all-zero.
    pub const fn is_valid(&self) -> bool {
        !self.is_multicast() && !self.is_zero()
    }

    /// Address of interface `index` on a board whose first address is `self`.
    ///
    /// The OUI is kept and `index` is added to the 24-bit NIC part, wrapping inside
    /// it. An invalid base yields `MacAddress::ZERO`.
    pub fn derive(&self, index: u8) -> MacAddress {
        if !self.is_valid() {
            return MacAddress::ZERO;
        }

        let o = self.0;
        let nic = u32::from_be_bytes([0, o[3], o[4], o[5]]).wrapping_add(index as u32);
        let [_, n3, n4, n5] = nic.to_be_bytes();
        MacAddress([o[0], o[1], o[2], n3, n4, n5])
    }

    /// Picks the base address RouterBOOT passes as `kmac=` on the kernel command line.
    pub fn from_kernel_args(args: &str) -> Option<MacAddress> {
        let value = args
            .split_ascii_whitespace()
            .find_map(|arg| arg.strip_prefix("kmac="))?;

        match value.parse() {
            Ok(mac) => Some(mac),
            Err(e) => {
                warn!("invalid kmac {:?}: {:?}", value, e);
                None
            }
        }
    }
}

impl From<[u8; ETH_ALEN]> for MacAddress {
    fn from(octets: [u8; ETH_ALEN]) -> Self {
        Self(octets)
    }
}

impl FromStr for MacAddress {
    type Err = MacParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let sep = match (s.contains(':'), s.contains('-')) {
            (true, true) => return Err(MacParseError::BadLength),
            (false, true) => '-',
            _ => ':',
        };

        let mut octets = [0u8; ETH_ALEN];
        let mut groups = s.split(sep);
        for octet in octets.iter_mut() {
            let group = groups.next().ok_or(MacParseError::BadLength)?;
            if group.is_empty() || group.len() > 2 || !group.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(MacParseError::BadDigit);
            }
            *octet = u8::from_str_radix(group, 16).map_err(|_| MacParseError::BadDigit)?;
        }
        if groups.next().is_some() {
            return Err(MacParseError::BadLength);
        }

        Ok(Self(octets))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            o[0], o[1], o[2], o[3], o[4], o[5]
        )
    }
}

impl fmt::Debug for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
