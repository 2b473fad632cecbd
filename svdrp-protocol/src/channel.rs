//! Channel descriptors as found in VDR's `channels.conf` and `LSTC` replies.
//!
//! A regular descriptor has 13 colon separated fields:
//! ```text
//! Name,Short;Provider:Frequency:Parameters:Source:Srate:VPID:APID:TPID:CAID:SID:NID:TID:RID
//! ```
//! A group separator starts with a colon: `:Group name` or `:@100 Group name`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SvdrpError};

/// Number of colon separated fields in a regular descriptor.
pub const DESCRIPTOR_FIELDS: usize = 13;

/// Frequencies above this value are scaled down by 1000 until they fit.
const MAX_BASE_FREQUENCY: u64 = 20000;

/// One entry of the channel list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// Channel number as reported by the server.
    pub number: u32,
    /// Full channel name, or the group name for separators.
    pub name: String,
    /// Separator or tunable service.
    pub kind: ChannelKind,
}

/// Distinguishes group separators from tunable services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelKind {
    /// Synthetic entry starting a named group.
    Group(GroupSeparator),
    /// A tunable channel.
    Service(ServiceParams),
}

/// Fields carried by a group separator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GroupSeparator {
    /// Position of the separator among all separators, starting at 1.
    /// Zero until the separator has been placed in a list.
    pub group_number: u32,
    /// Explicit `@number` given in the descriptor, zero if none.
    pub display_number: u32,
}

/// Tuning data of a regular channel.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServiceParams {
    pub short_name: Option<String>,
    pub provider: Option<String>,
    pub frequency: u64,
    pub parameters: String,
    pub source: String,
    pub symbol_rate: u32,
    pub video_pid: String,
    pub audio_pid: String,
    pub teletext_pid: String,
    pub ca_id: String,
    pub service_id: u32,
    pub network_id: u32,
    pub transport_id: u32,
    pub remote_id: u32,
}

impl Channel {
    /// Parse a descriptor reported for channel `number`.
    pub fn parse(descriptor: &str, number: u32) -> Result<Self> {
        match descriptor.strip_prefix(':') {
            Some(group) => parse_group(group, number),
            None => parse_service(descriptor, number),
        }
    }

    /// Parse one `LSTC` reply line: `<number> <descriptor>`.
    pub fn parse_list_line(line: &str) -> Result<Self> {
        let (number, descriptor) = line.split_once(' ').ok_or_else(|| {
            SvdrpError::MalformedResponse(format!("channel line without number: {:?}", line))
        })?;
        let number = number.parse::<u32>().map_err(|_| {
            SvdrpError::MalformedResponse(format!("bad channel number in {:?}", line))
        })?;
        Self::parse(descriptor, number)
    }

    /// Create a group separator.
    pub fn group(name: impl Into<String>, number: u32) -> Self {
        Self {
            number,
            name: name.into(),
            kind: ChannelKind::Group(GroupSeparator::default()),
        }
    }

    /// Create a regular channel.
    pub fn service(name: impl Into<String>, number: u32, params: ServiceParams) -> Self {
        Self {
            number,
            name: name.into(),
            kind: ChannelKind::Service(params),
        }
    }

    pub fn is_group_separator(&self) -> bool {
        matches!(self.kind, ChannelKind::Group(_))
    }

    /// Tuning data, `None` for group separators.
    pub fn service_params(&self) -> Option<&ServiceParams> {
        match &self.kind {
            ChannelKind::Service(p) => Some(p),
            ChannelKind::Group(_) => None,
        }
    }

    /// Group number of a separator.
    pub fn group_number(&self) -> Option<u32> {
        match &self.kind {
            ChannelKind::Group(g) => Some(g.group_number),
            ChannelKind::Service(_) => None,
        }
    }

    /// Assign the group number of a separator. No effect on services.
    pub fn set_group_number(&mut self, group_number: u32) {
        if let ChannelKind::Group(g) = &mut self.kind {
            g.group_number = group_number;
        }
    }

    fn source_starts_with(&self, prefix: char) -> bool {
        self.service_params()
            .is_some_and(|p| p.source.starts_with(prefix))
    }

    pub fn is_atsc(&self) -> bool {
        self.source_starts_with('A')
    }

    pub fn is_cable(&self) -> bool {
        self.source_starts_with('C')
    }

    pub fn is_satellite(&self) -> bool {
        self.source_starts_with('S')
    }

    pub fn is_terrestrial(&self) -> bool {
        self.source_starts_with('T')
    }

    /// Numeric transponder identifier derived from frequency and polarization.
    ///
    /// Always 0 for group separators.
    pub fn transponder_id(&self) -> u32 {
        let Some(params) = self.service_params() else {
            return 0;
        };

        let mut freq = params.frequency;
        while freq > MAX_BASE_FREQUENCY {
            freq /= 1000;
        }
        // at most 20000 after scaling
        let mut tf = freq as u32;

        if self.is_satellite() {
            // VDR upper-cases the polarization when it reads the parameters
            let polarization = params
                .parameters
                .chars()
                .next()
                .map(|c| c.to_ascii_uppercase());
            tf += match polarization {
                Some('H') => 100_000,
                Some('V') => 200_000,
                Some('L') => 300_000,
                Some('R') => 400_000,
                _ => 0,
            };
        }
        tf
    }

    /// Identifier that stays stable when channels are renumbered.
    ///
    /// `GROUP<n>` for separators, otherwise `source-nid-tid-sid[-rid]`.
    pub fn channel_id(&self) -> String {
        match &self.kind {
            ChannelKind::Group(g) => format!("GROUP{}", g.group_number),
            ChannelKind::Service(p) => {
                let tid = if p.network_id != 0 || p.transport_id != 0 {
                    p.transport_id
                } else {
                    self.transponder_id()
                };
                let mut id = format!("{}-{}-{}-{}", p.source, p.network_id, tid, p.service_id);
                if p.remote_id != 0 {
                    id.push_str(&format!("-{}", p.remote_id));
                }
                id
            }
        }
    }

    /// Descriptor text as accepted by the server.
    pub fn to_descriptor(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ChannelKind::Group(g) if g.display_number != 0 => {
                write!(f, ":@{} {}", g.display_number, self.name)
            }
            ChannelKind::Group(_) => write!(f, ":{}", self.name),
            ChannelKind::Service(p) => {
                f.write_str(&self.name)?;
                if let Some(short) = &p.short_name {
                    write!(f, ",{}", short)?;
                }
                if let Some(provider) = &p.provider {
                    write!(f, ";{}", provider)?;
                }
                write!(
                    f,
                    ":{}:{}:{}:{}:{}:{}:{}:{}:{}:{}:{}:{}",
                    p.frequency,
                    p.parameters,
                    p.source,
                    p.symbol_rate,
                    p.video_pid,
                    p.audio_pid,
                    p.teletext_pid,
                    p.ca_id,
                    p.service_id,
                    p.network_id,
                    p.transport_id,
                    p.remote_id
                )
            }
        }
    }
}

fn parse_group(rest: &str, number: u32) -> Result<Channel> {
    let Some(numbered) = rest.strip_prefix('@') else {
        return Ok(Channel::group(rest, number));
    };

    let (display, name) = numbered.split_once(' ').unwrap_or((numbered, ""));
    let display_number = display.parse::<u32>().map_err(|_| {
        SvdrpError::InvalidChannel(format!("bad group number {:?}", display))
    })?;

    Ok(Channel {
        number: display_number,
        name: name.to_string(),
        kind: ChannelKind::Group(GroupSeparator {
            group_number: 0,
            display_number,
        }),
    })
}

fn parse_numeric<T: FromStr>(field: &str, what: &str, descriptor: &str) -> Result<T> {
    field.parse::<T>().map_err(|_| {
        SvdrpError::InvalidChannel(format!("bad {} {:?} in {:?}", what, field, descriptor))
    })
}

fn parse_service(descriptor: &str, number: u32) -> Result<Channel> {
    let fields: Vec<&str> = descriptor.split(':').collect();
    let [name_block, frequency, parameters, source, symbol_rate, vpid, apid, tpid, caid, sid, nid, tid, rid] =
        fields.as_slice()
    else {
        return Err(SvdrpError::InvalidChannel(format!(
            "expected {} fields, got {} in {:?}",
            DESCRIPTOR_FIELDS,
            fields.len(),
            descriptor
        )));
    };

    let (names, provider) = match name_block.split_once(';') {
        Some((n, p)) => (n, Some(p.to_string())),
        None => (*name_block, None),
    };
    let (name, short_name) = match names.split_once(',') {
        Some((n, s)) => (n, Some(s.to_string())),
        None => (names, None),
    };

    let params = ServiceParams {
        short_name,
        provider,
        frequency: parse_numeric(frequency, "frequency", descriptor)?,
        parameters: parameters.to_string(),
        source: source.to_string(),
        symbol_rate: parse_numeric(symbol_rate, "symbol rate", descriptor)?,
        video_pid: vpid.to_string(),
        audio_pid: apid.to_string(),
        teletext_pid: tpid.to_string(),
        ca_id: caid.to_string(),
        service_id: parse_numeric(sid, "service id", descriptor)?,
        network_id: parse_numeric(nid, "network id", descriptor)?,
        transport_id: parse_numeric(tid, "transport id", descriptor)?,
        remote_id: parse_numeric(rid, "radio id", descriptor)?,
    };

    Ok(Channel::service(name, number, params))
}

/// Reference to a channel as accepted by `LSTC`, `DELC`, `LSTE` and `CLRE`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelKey {
    /// Current channel number.
    Number(u32),
    /// Channel id such as `S19.2E-1-1019-10301`.
    Id(String),
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelKey::Number(n) => write!(f, "{}", n),
            ChannelKey::Id(id) => f.write_str(id),
        }
    }
}

impl From<u32> for ChannelKey {
    fn from(number: u32) -> Self {
        ChannelKey::Number(number)
    }
}

impl From<&str> for ChannelKey {
    fn from(id: &str) -> Self {
        ChannelKey::Id(id.to_string())
    }
}

impl From<String> for ChannelKey {
    fn from(id: String) -> Self {
        ChannelKey::Id(id)
    }
}

impl From<&Channel> for ChannelKey {
    fn from(channel: &Channel) -> Self {
        ChannelKey::Id(channel.channel_id())
    }
}

impl FromStr for ChannelKey {
    type Err = SvdrpError;

    /// All-digit input is a channel number, anything else an id.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(SvdrpError::InvalidChannel("empty channel key".to_string()));
        }
        if s.bytes().all(|b| b.is_ascii_digit()) {
            s.parse::<u32>()
                .map(ChannelKey::Number)
                .map_err(|_| {
                    SvdrpError::InvalidChannel(format!("channel number {:?} out of range", s))
                })
        } else {
            Ok(ChannelKey::Id(s.to_string()))
        }
    }
}

/// Ordered channel list, group separators included.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChannelList {
    channels: Vec<Channel>,
}

impl ChannelList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a list from `LSTC` reply lines, numbering the group separators.
    pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> Result<Self> {
        let mut list = Self::new();
        for line in lines {
            list.push(Channel::parse_list_line(line.as_ref())?);
        }
        Ok(list)
    }

    /// Append a channel. Separators get the next free group number.
    pub fn push(&mut self, mut channel: Channel) {
        if channel.is_group_separator() {
            let next = self.channels.iter().filter(|c| c.is_group_separator()).count() as u32 + 1;
            channel.set_group_number(next);
        }
        self.channels.push(channel);
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Channel> {
        self.channels.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Channel> {
        self.channels.iter()
    }

    pub fn as_slice(&self) -> &[Channel] {
        &self.channels
    }

    /// Index of the first channel with the given number.
    pub fn find_by_number(&self, number: u32) -> Result<usize> {
        self.channels
            .iter()
            .position(|c| c.number == number)
            .ok_or_else(|| {
                SvdrpError::NotFound(format!("channel number '{}' is not in channel list", number))
            })
    }

    /// Index of the first channel with the given id.
    pub fn find_by_channel_id(&self, channel_id: &str) -> Result<usize> {
        self.channels
            .iter()
            .position(|c| c.channel_id() == channel_id)
            .ok_or_else(|| {
                SvdrpError::NotFound(format!("channel id '{}' is not in channel list", channel_id))
            })
    }

    /// Index of the channel a key refers to.
    pub fn find(&self, key: &ChannelKey) -> Result<usize> {
        match key {
            ChannelKey::Number(n) => self.find_by_number(*n),
            ChannelKey::Id(id) => self.find_by_channel_id(id),
        }
    }
}

impl std::ops::Index<usize> for ChannelList {
    type Output = Channel;

    fn index(&self, index: usize) -> &Channel {
        &self.channels[index]
    }
}

impl IntoIterator for ChannelList {
    type Item = Channel;
    type IntoIter = std::vec::IntoIter<Channel>;

    fn into_iter(self) -> Self::IntoIter {
        self.channels.into_iter()
    }
}

impl<'a> IntoIterator for &'a ChannelList {
    type Item = &'a Channel;
    type IntoIter = std::slice::Iter<'a, Channel>;

    fn into_iter(self) -> Self::IntoIter {
        self.channels.iter()
    }
}

impl FromIterator<Channel> for ChannelList {
    fn from_iter<I: IntoIterator<Item = Channel>>(iter: I) -> Self {
        let mut list = Self::new();
        for channel in iter {
            list.push(channel);
        }
        list
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAS_ERSTE: &str = "Das Erste HD;ARD:11494:HC23M5O35P0S1:S19.2E:22000:5101=27:5102=deu@3,5103=mis@3;5106=deu@106:5104;5105=deu:0:10301:1:1019:0";
    const ZDF_DVBT: &str = "ZDF,ZDF-T;ZDFmobil:522000000:B8C23D12G8M16S0T8Y0:T:0:545=2:546=deu@3:551:0:514:0:0:0";
    const RADIO: &str = "Bayern 3:12265:hC34M2O0S0:S19.2E:27500:0:2001=deu:0:0:28401:1:1093:5";

    #[test]
    fn test_parse_satellite_channel() {
        let ch = Channel::parse(DAS_ERSTE, 1).unwrap();
        assert_eq!(ch.number, 1);
        assert_eq!(ch.name, "Das Erste HD");
        assert!(!ch.is_group_separator());
        assert!(ch.is_satellite());

        let p = ch.service_params().unwrap();
        assert_eq!(p.provider.as_deref(), Some("ARD"));
        assert_eq!(p.short_name, None);
        assert_eq!(p.frequency, 11494);
        assert_eq!(p.symbol_rate, 22000);
        assert_eq!(p.audio_pid, "5102=deu@3,5103=mis@3;5106=deu@106");
        assert_eq!(p.service_id, 10301);
        assert_eq!(p.network_id, 1);
        assert_eq!(p.transport_id, 1019);
        assert_eq!(ch.channel_id(), "S19.2E-1-1019-10301");
    }

    #[test]
    fn test_parse_short_name_and_provider() {
        let ch = Channel::parse(ZDF_DVBT, 2).unwrap();
        let p = ch.service_params().unwrap();
        assert_eq!(ch.name, "ZDF");
        assert_eq!(p.short_name.as_deref(), Some("ZDF-T"));
        assert_eq!(p.provider.as_deref(), Some("ZDFmobil"));
        assert!(ch.is_terrestrial());
    }

    #[test]
    fn test_descriptor_round_trip() {
        for (n, d) in [(1, DAS_ERSTE), (2, ZDF_DVBT), (3, RADIO)] {
            let ch = Channel::parse(d, n).unwrap();
            assert_eq!(ch.to_descriptor(), d);
        }
    }

    #[test]
    fn test_empty_short_name_survives_round_trip() {
        let d = "Name,;Prov:11494:H:S19.2E:22000:0:0:0:0:1:2:3:0";
        let ch = Channel::parse(d, 1).unwrap();
        assert_eq!(ch.service_params().unwrap().short_name.as_deref(), Some(""));
        assert_eq!(ch.to_descriptor(), d);
    }

    #[test]
    fn test_distinct_descriptors_parse_differently() {
        let a = Channel::parse(RADIO, 3).unwrap();
        let b = Channel::parse(&RADIO.replace(":5", ":6"), 3).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_remote_id_in_channel_id() {
        let ch = Channel::parse(RADIO, 3).unwrap();
        assert_eq!(ch.channel_id(), "S19.2E-1-1093-28401-5");
    }

    #[test]
    fn test_transponder_fallback_in_channel_id() {
        let ch = Channel::parse(ZDF_DVBT, 2).unwrap();
        assert_eq!(ch.transponder_id(), 522);
        assert_eq!(ch.channel_id(), "T-0-522-514");
    }

    #[test]
    fn test_transponder_polarization_offsets() {
        let base = "X:11494:{}:S19.2E:22000:0:0:0:0:100:0:0:0";
        for (pol, expected) in [("H", 111494), ("V", 211494), ("L", 311494), ("R", 411494), ("v", 211494), ("", 11494), ("M2", 11494)] {
            let ch = Channel::parse(&base.replace("{}", pol), 1).unwrap();
            assert_eq!(ch.transponder_id(), expected, "polarization {:?}", pol);
        }
        let ch = Channel::parse(&base.replace("{}", "H"), 1).unwrap();
        assert_eq!(ch.channel_id(), "S19.2E-0-111494-100");
    }

    #[test]
    fn test_transponder_ignores_polarization_off_satellite() {
        let ch = Channel::parse("X:346000:H:C:6900:0:0:0:0:1:0:0:0", 1).unwrap();
        assert!(ch.is_cable());
        assert_eq!(ch.transponder_id(), 346);
    }

    #[test]
    fn test_transponder_scale_invariant() {
        let make = |f: u64| {
            Channel::parse(&format!("X:{}:V:S19.2E:22000:0:0:0:0:1:0:0:0", f), 1)
                .unwrap()
                .transponder_id()
        };
        assert_eq!(make(12188), 212188);
        assert_eq!(make(12188), make(12_188_000));
        assert_eq!(make(12_188_000), make(12_188_000_000));
    }

    #[test]
    fn test_parse_group_separator() {
        let ch = Channel::parse(":Öffentlich-Rechtliche", 5).unwrap();
        assert!(ch.is_group_separator());
        assert_eq!(ch.number, 5);
        assert_eq!(ch.name, "Öffentlich-Rechtliche");
        assert_eq!(ch.to_descriptor(), ":Öffentlich-Rechtliche");
        assert!(ch.service_params().is_none());
        assert_eq!(ch.transponder_id(), 0);
    }

    #[test]
    fn test_parse_numbered_group_separator() {
        let ch = Channel::parse(":@100 Radio Stations", 42).unwrap();
        assert_eq!(ch.number, 100);
        assert_eq!(ch.name, "Radio Stations");
        assert_eq!(ch.to_descriptor(), ":@100 Radio Stations");
        assert!(matches!(
            Channel::parse(":@x Radio", 1),
            Err(SvdrpError::InvalidChannel(_))
        ));
    }

    #[test]
    fn test_parse_rejects_bad_descriptors() {
        assert!(matches!(
            Channel::parse("Only:a:few:fields", 1),
            Err(SvdrpError::InvalidChannel(_))
        ));
        assert!(matches!(
            Channel::parse("X:abc:H:S19.2E:22000:0:0:0:0:1:0:0:0", 1),
            Err(SvdrpError::InvalidChannel(_))
        ));
        assert!(matches!(
            Channel::parse("X:11494:H:S19.2E:22000:0:0:0:0:1:0:0:0:extra", 1),
            Err(SvdrpError::InvalidChannel(_))
        ));
    }

    #[test]
    fn test_list_assigns_group_numbers() {
        let lines = vec![
            "0 :Public".to_string(),
            format!("1 {}", DAS_ERSTE),
            format!("2 {}", ZDF_DVBT),
            "0 :Radio".to_string(),
            format!("3 {}", RADIO),
        ];
        let list = ChannelList::from_lines(&lines).unwrap();
        assert_eq!(list.len(), 5);
        assert_eq!(list[0].channel_id(), "GROUP1");
        assert_eq!(list[3].channel_id(), "GROUP2");
        assert_eq!(list[3].group_number(), Some(2));

        assert_eq!(list.find_by_number(2).unwrap(), 2);
        assert_eq!(list.find_by_channel_id("GROUP2").unwrap(), 3);
        assert_eq!(list.find_by_channel_id("S19.2E-1-1093-28401-5").unwrap(), 4);
        assert_eq!(list.find(&ChannelKey::Number(1)).unwrap(), 1);
    }

    #[test]
    fn test_list_lookup_miss_is_not_found() {
        let list = ChannelList::from_lines(&[format!("1 {}", DAS_ERSTE)]).unwrap();
        assert!(matches!(list.find_by_number(9), Err(SvdrpError::NotFound(_))));
        match list.find_by_channel_id("S19.2E-0-0-0") {
            Err(SvdrpError::NotFound(msg)) => assert!(msg.contains("S19.2E-0-0-0")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_list_line_without_number() {
        assert!(matches!(
            ChannelList::from_lines(&["garbage"]),
            Err(SvdrpError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_channel_key_conversions() {
        assert_eq!("12".parse::<ChannelKey>().unwrap(), ChannelKey::Number(12));
        assert_eq!(
            "S19.2E-1-1019-10301".parse::<ChannelKey>().unwrap(),
            ChannelKey::Id("S19.2E-1-1019-10301".to_string())
        );
        let ch = Channel::parse(DAS_ERSTE, 1).unwrap();
        assert_eq!(ChannelKey::from(&ch).to_string(), "S19.2E-1-1019-10301");
        assert_eq!(ChannelKey::from(7u32).to_string(), "7");
    }

    #[test]
    fn test_bad_channel_key_is_invalid() {
        assert!(matches!(
            "".parse::<ChannelKey>(),
            Err(SvdrpError::InvalidChannel(_))
        ));
        assert!(matches!(
            "  ".parse::<ChannelKey>(),
            Err(SvdrpError::InvalidChannel(_))
        ));
        assert!(matches!(
            "99999999999".parse::<ChannelKey>(),
            Err(SvdrpError::InvalidChannel(_))
        ));
    }

    #[test]
    fn test_lowercase_polarization_counts() {
        let upper = Channel::parse("X:11494:H:S19.2E:22000:0:0:0:0:100:0:0:0", 1).unwrap();
        let lower = Channel::parse("X:11494:h:S19.2E:22000:0:0:0:0:100:0:0:0", 1).unwrap();
        assert_eq!(lower.transponder_id(), 111494);
        assert_eq!(lower.transponder_id(), upper.transponder_id());
        assert_eq!(Channel::parse(RADIO, 1).unwrap().transponder_id(), 112265);
    }
}
