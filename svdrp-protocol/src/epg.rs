//! EPG data in the tagged line format used by `LSTE` and `PUTE`.
//!
//! ```text
//! C <channel id> <channel name>
//! E <event id> <start time> <duration> <table id> <version>
//! T <title>
//! S <short text>
//! D <description, '|' separates lines>
//! G <content code> <content code> ...
//! R <parental rating>
//! X <component>            (repeated)
//! V <vps time>
//! @ <aux data>
//! e
//! c
//! ```
//! Table id and version are hexadecimal.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SvdrpError};

/// Derive an event id from a start time: minutes since the epoch, truncated to 16 bits.
pub fn derive_event_id(start_time: i64) -> u32 {
    start_time.div_euclid(60).rem_euclid(0x10000) as u32
}

/// One programme entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpgEvent {
    event_id: u32,
    start_time: i64,
    /// Duration in seconds.
    pub duration: u32,
    pub table_id: u8,
    pub version: u8,
    pub title: Option<String>,
    pub short_text: Option<String>,
    /// May contain line breaks.
    pub description: Option<String>,
    pub content_codes: Option<Vec<String>>,
    pub parental_rating: Option<String>,
    pub components: Vec<String>,
    pub vps: Option<String>,
    pub aux: Option<String>,
}

impl EpgEvent {
    /// Create an event whose id is derived from `start_time`.
    ///
    /// The id is fixed here; later calls to [`EpgEvent::set_start_time`]
    /// do not change it.
    pub fn new(start_time: i64, duration: u32) -> Self {
        Self::with_id(derive_event_id(start_time), start_time, duration)
    }

    /// Create an event with an explicit id.
    pub fn with_id(event_id: u32, start_time: i64, duration: u32) -> Self {
        Self {
            event_id,
            start_time,
            duration,
            table_id: 0,
            version: 0,
            title: None,
            short_text: None,
            description: None,
            content_codes: None,
            parental_rating: None,
            components: Vec::new(),
            vps: None,
            aux: None,
        }
    }

    pub fn event_id(&self) -> u32 {
        self.event_id
    }

    pub fn set_event_id(&mut self, event_id: u32) {
        self.event_id = event_id;
    }

    /// Start time in seconds since the epoch.
    pub fn start_time(&self) -> i64 {
        self.start_time
    }

    pub fn set_start_time(&mut self, start_time: i64) {
        self.start_time = start_time;
    }

    /// End time in seconds since the epoch.
    pub fn end_time(&self) -> i64 {
        self.start_time + i64::from(self.duration)
    }
}

/// All events of one channel.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EpgSchedule {
    pub channel_id: String,
    pub channel_name: String,
    pub events: Vec<EpgEvent>,
}

impl EpgSchedule {
    pub fn new(channel_id: impl Into<String>, channel_name: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            channel_name: channel_name.into(),
            events: Vec::new(),
        }
    }
}

/// Schedules in the order the server sent them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Schedules {
    schedules: Vec<EpgSchedule>,
}

impl Schedules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, schedule: EpgSchedule) {
        self.schedules.push(schedule);
    }

    /// Schedule of a channel id.
    pub fn get(&self, channel_id: &str) -> Option<&EpgSchedule> {
        self.schedules.iter().find(|s| s.channel_id == channel_id)
    }

    pub fn len(&self) -> usize {
        self.schedules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schedules.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EpgSchedule> {
        self.schedules.iter()
    }
}

impl From<Vec<EpgSchedule>> for Schedules {
    fn from(schedules: Vec<EpgSchedule>) -> Self {
        Self { schedules }
    }
}

impl IntoIterator for Schedules {
    type Item = EpgSchedule;
    type IntoIter = std::vec::IntoIter<EpgSchedule>;

    fn into_iter(self) -> Self::IntoIter {
        self.schedules.into_iter()
    }
}

/// Forward-only position in a sequence of EPG lines.
///
/// Shared by every level of the parser; a level consumes lines up to and
/// including its own terminator.
#[derive(Debug)]
pub struct LineCursor<'a, S> {
    lines: &'a [S],
    pos: usize,
}

impl<'a, S: AsRef<str>> LineCursor<'a, S> {
    pub fn new(lines: &'a [S]) -> Self {
        Self { lines, pos: 0 }
    }

    /// Index of the next unread line.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.lines.len()
    }

    /// Split the next line into tag and payload and advance past it.
    fn next_tagged(&mut self) -> Option<(char, &'a str)> {
        let lines: &'a [S] = self.lines;
        let line = lines.get(self.pos)?.as_ref();
        self.pos += 1;
        Some(split_tag(line))
    }

    fn malformed(&self, what: String) -> SvdrpError {
        SvdrpError::MalformedEpg(format!("line {}: {}", self.pos, what))
    }
}

fn split_tag(line: &str) -> (char, &str) {
    let mut chars = line.chars();
    let tag = chars.next().unwrap_or(' ');
    let rest = chars.as_str();
    (tag, rest.strip_prefix(' ').unwrap_or(rest))
}

/// Parse a complete EPG listing.
pub fn parse_epg<S: AsRef<str>>(lines: &[S]) -> Result<Schedules> {
    let mut cursor = LineCursor::new(lines);
    parse_schedules(&mut cursor)
}

/// Top level: a sequence of `C ... c` blocks.
pub fn parse_schedules<S: AsRef<str>>(cursor: &mut LineCursor<'_, S>) -> Result<Schedules> {
    let mut schedules = Schedules::new();
    while let Some((tag, payload)) = cursor.next_tagged() {
        match tag {
            'C' => {
                let (channel_id, channel_name) = payload.split_once(' ').unwrap_or((payload, ""));
                if channel_id.is_empty() {
                    return Err(cursor.malformed("schedule without channel id".into()));
                }
                let mut schedule = EpgSchedule::new(channel_id, channel_name);
                parse_schedule_body(cursor, &mut schedule)?;
                schedules.push(schedule);
            }
            other => return Err(cursor.malformed(format!("unknown tag {:?} outside schedule", other))),
        }
    }
    Ok(schedules)
}

/// Schedule level: events until the closing `c`.
pub fn parse_schedule_body<S: AsRef<str>>(
    cursor: &mut LineCursor<'_, S>,
    schedule: &mut EpgSchedule,
) -> Result<()> {
    while let Some((tag, payload)) = cursor.next_tagged() {
        match tag {
            'E' => {
                let mut event = parse_event_header(payload).map_err(|e| cursor.malformed(e))?;
                parse_event_body(cursor, &mut event)?;
                schedule.events.push(event);
            }
            'c' => return Ok(()),
            other => return Err(cursor.malformed(format!("unknown tag {:?} in schedule", other))),
        }
    }
    Err(cursor.malformed(format!("schedule {} not terminated", schedule.channel_id)))
}

fn parse_event_header(payload: &str) -> std::result::Result<EpgEvent, String> {
    let fields: Vec<&str> = payload.split_whitespace().collect();
    let [event_id, start_time, duration, table_id, version] = *fields.as_slice() else {
        return Err(format!("event header needs 5 fields: {:?}", payload));
    };

    let bad = |what: &str, value: &str| format!("bad {} {:?}", what, value);
    let event_id = event_id.parse::<u32>().map_err(|_| bad("event id", event_id))?;
    let start_time = start_time.parse::<i64>().map_err(|_| bad("start time", start_time))?;
    let duration = duration.parse::<u32>().map_err(|_| bad("duration", duration))?;
    let table_id = u8::from_str_radix(table_id, 16).map_err(|_| bad("table id", table_id))?;
    let version = u8::from_str_radix(version, 16).map_err(|_| bad("version", version))?;

    let mut event = EpgEvent::with_id(event_id, start_time, duration);
    event.table_id = table_id;
    event.version = version;
    Ok(event)
}

fn set_once(slot: &mut Option<String>, value: &str, tag: char) -> std::result::Result<(), String> {
    if slot.is_some() {
        return Err(format!("duplicate tag {:?} in event", tag));
    }
    *slot = Some(value.to_string());
    Ok(())
}

/// Event level: field tags until the closing `e`.
pub fn parse_event_body<S: AsRef<str>>(
    cursor: &mut LineCursor<'_, S>,
    event: &mut EpgEvent,
) -> Result<()> {
    while let Some((tag, payload)) = cursor.next_tagged() {
        let outcome = match tag {
            'T' => set_once(&mut event.title, payload, tag),
            'S' => set_once(&mut event.short_text, payload, tag),
            'D' => set_once(&mut event.description, &payload.replace('|', "\n"), tag),
            'R' => set_once(&mut event.parental_rating, payload, tag),
            'V' => set_once(&mut event.vps, payload, tag),
            '@' => set_once(&mut event.aux, payload, tag),
            'G' => {
                if event.content_codes.is_some() {
                    Err("duplicate tag 'G' in event".to_string())
                } else {
                    event.content_codes =
                        Some(payload.split_whitespace().map(str::to_string).collect());
                    Ok(())
                }
            }
            'X' => {
                event.components.push(payload.to_string());
                Ok(())
            }
            'e' => return Ok(()),
            other => Err(format!("unknown tag {:?} in event", other)),
        };
        outcome.map_err(|e| cursor.malformed(e))?;
    }
    Err(cursor.malformed(format!("event {} not terminated", event.event_id)))
}

/// Serialize schedules into EPG lines, terminators included.
pub fn serialize_epg(schedules: &Schedules) -> Vec<String> {
    let mut lines = Vec::new();
    for schedule in schedules.iter() {
        serialize_schedule(schedule, &mut lines);
    }
    lines
}

/// Serialize one schedule.
pub fn serialize_schedule(schedule: &EpgSchedule, out: &mut Vec<String>) {
    out.push(format!("C {} {}", schedule.channel_id, schedule.channel_name));
    for event in &schedule.events {
        serialize_event(event, out);
    }
    out.push("c".to_string());
}

/// Serialize one event in the fixed tag order `T S D G R X* V @`.
pub fn serialize_event(event: &EpgEvent, out: &mut Vec<String>) {
    out.push(format!(
        "E {} {} {} {:X} {:X}",
        event.event_id, event.start_time, event.duration, event.table_id, event.version
    ));
    if let Some(title) = &event.title {
        out.push(format!("T {}", title));
    }
    if let Some(short_text) = &event.short_text {
        out.push(format!("S {}", short_text));
    }
    if let Some(description) = &event.description {
        out.push(format!("D {}", description.replace('\n', "|")));
    }
    if let Some(codes) = &event.content_codes {
        out.push(format!("G {}", codes.join(" ")));
    }
    if let Some(rating) = &event.parental_rating {
        out.push(format!("R {}", rating));
    }
    for component in &event.components {
        out.push(format!("X {}", component));
    }
    if let Some(vps) = &event.vps {
        out.push(format!("V {}", vps));
    }
    if let Some(aux) = &event.aux {
        out.push(format!("@ {}", aux));
    }
    out.push("e".to_string());
}
