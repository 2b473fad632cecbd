//! Channel repositioning on top of the server's `MOVC` primitive.
//!
//! `MOVC` only knows "move channel number A to number B" and where the
//! channel ends up depends on the move direction (and some server versions
//! land one off). [`reposition`] moves a channel next to a target channel,
//! checks where it landed and corrects the order with at most one extra
//! move.

use async_trait::async_trait;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use svdrp_protocol::{ChannelList, Result, SvdrpError};

use crate::client::{Session, Transport};

/// Channel operations the reorder algorithm needs.
#[async_trait]
pub trait ChannelStore: Send {
    async fn list_channels(&mut self, with_groups: bool) -> Result<ChannelList>;

    async fn move_channel(&mut self, from: u32, to: u32) -> Result<(u32, u32)>;
}

#[async_trait]
impl<S: Transport> ChannelStore for Session<S> {
    async fn list_channels(&mut self, with_groups: bool) -> Result<ChannelList> {
        Session::list_channels(self, with_groups).await
    }

    async fn move_channel(&mut self, from: u32, to: u32) -> Result<(u32, u32)> {
        Session::move_channel(self, from, to).await
    }
}

/// Where to put a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositionRequest {
    /// Channel id of the channel to move.
    pub source_id: String,
    /// Channel id (or `GROUP<n>`) of the reference position.
    pub target_id: String,
    /// Put the source behind the target instead of in front of it.
    pub place_after: bool,
    /// Allow the move to leave a group without channels.
    pub allow_breaking_groups: bool,
}

impl RepositionRequest {
    pub fn new(source_id: impl Into<String>, target_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            place_after: false,
            allow_breaking_groups: false,
        }
    }

    pub fn after(mut self) -> Self {
        self.place_after = true;
        self
    }

    pub fn allow_breaking_groups(mut self) -> Self {
        self.allow_breaking_groups = true;
        self
    }
}

/// True if removing the channel at `index` leaves an empty group.
fn would_empty_group(channels: &ChannelList, index: usize) -> bool {
    let is_separator = |i: usize| channels.get(i).is_some_and(|c| c.is_group_separator());
    let last = channels.len().saturating_sub(1);

    if index == 0 {
        is_separator(1)
    } else if index == last {
        is_separator(index - 1)
    } else {
        is_separator(index - 1) && is_separator(index + 1)
    }
}

/// Move a channel directly before or after another one.
///
/// Fails with [`SvdrpError::Conflict`] before any move is issued if an id
/// is unknown, the source is a group separator, or the move would empty a
/// group. Returns the number of `MOVC` calls made.
pub async fn reposition<T>(store: &mut T, request: &RepositionRequest) -> Result<usize>
where
    T: ChannelStore + ?Sized,
{
    let channels = store.list_channels(true).await?;

    let source_index = channels
        .find_by_channel_id(&request.source_id)
        .map_err(|_| SvdrpError::Conflict(format!("source id {} is invalid", request.source_id)))?;
    let mut target_index = channels
        .find_by_channel_id(&request.target_id)
        .map_err(|_| SvdrpError::Conflict(format!("target id {} is invalid", request.target_id)))?;

    if !request.allow_breaking_groups && would_empty_group(&channels, source_index) {
        return Err(SvdrpError::Conflict(
            "moving this channel would empty a group".to_string(),
        ));
    }
    if channels[source_index].is_group_separator() {
        return Err(SvdrpError::Conflict(
            "group separators cannot be moved".to_string(),
        ));
    }

    let mut place_after = request.place_after;
    if channels[target_index].is_group_separator() {
        // Separators have no position of their own; use the channel next to it
        let redirected = if place_after {
            target_index.checked_add(1)
        } else {
            target_index.checked_sub(1)
        };
        target_index = redirected
            .filter(|&i| i < channels.len())
            .ok_or_else(|| {
                SvdrpError::Conflict(format!(
                    "no channel next to group {}",
                    request.target_id
                ))
            })?;
        place_after = !place_after;
    }
    if target_index == source_index {
        debug!("{} is already in place", request.source_id);
        return Ok(0);
    }
    let target_id = channels[target_index].channel_id();

    let source_number = channels[source_index].number;
    let target_number = channels[target_index].number;
    store.move_channel(source_number, target_number).await?;
    let mut moves = 1;

    let channels = store.list_channels(true).await?;
    let source_index = channels.find_by_channel_id(&request.source_id)?;
    let target_index = channels.find_by_channel_id(&target_id)?;

    if (source_index < target_index && place_after) || (target_index < source_index && !place_after)
    {
        debug!(
            "{} landed on the wrong side of {}, moving again",
            request.source_id, target_id
        );
        store
            .move_channel(channels[source_index].number, channels[target_index].number)
            .await?;
        moves += 1;
    }

    info!(
        "Placed {} {} {}",
        request.source_id,
        if place_after { "after" } else { "before" },
        target_id
    );
    Ok(moves)
}

#[cfg(test)]
mod tests {
    use super::*;
    use svdrp_protocol::Channel;

    /// Channel list with the server's move semantics: a channel moved
    /// downwards lands behind the target, one moved upwards in front of it.
    struct FakeStore {
        channels: Vec<Channel>,
        moves: Vec<(u32, u32)>,
    }

    fn sid(name: &str) -> u32 {
        name.bytes().map(u32::from).sum()
    }

    fn id(name: &str) -> String {
        format!("S19.2E-1-1019-{}", sid(name))
    }

    impl FakeStore {
        /// Names starting with `:` are group separators.
        fn new(names: &[&str]) -> Self {
            let channels = names
                .iter()
                .map(|name| match name.strip_prefix(':') {
                    Some(group) => Channel::group(group, 0),
                    None => Channel::parse(
                        &format!("{}:11493:H:S19.2E:22000:0:0:0:0:{}:1:1019:0", name, sid(name)),
                        0,
                    )
                    .unwrap(),
                })
                .collect();
            let mut store = Self {
                channels,
                moves: Vec::new(),
            };
            store.renumber();
            store
        }

        fn renumber(&mut self) {
            let mut next = 1;
            for channel in &mut self.channels {
                channel.number = next;
                if !channel.is_group_separator() {
                    next += 1;
                }
            }
        }

        fn position(&self, number: u32) -> Option<usize> {
            self.channels
                .iter()
                .position(|c| !c.is_group_separator() && c.number == number)
        }

        fn names(&self) -> Vec<String> {
            self.channels
                .iter()
                .map(|c| {
                    if c.is_group_separator() {
                        format!(":{}", c.name)
                    } else {
                        c.name.clone()
                    }
                })
                .collect()
        }
    }

    #[async_trait]
    impl ChannelStore for FakeStore {
        async fn list_channels(&mut self, _with_groups: bool) -> Result<ChannelList> {
            Ok(self.channels.iter().cloned().collect())
        }

        async fn move_channel(&mut self, from: u32, to: u32) -> Result<(u32, u32)> {
            let (Some(from_index), Some(to_index)) = (self.position(from), self.position(to))
            else {
                return Err(SvdrpError::Server {
                    kind: svdrp_protocol::ServerErrorKind::ParameterError,
                    code: 501,
                    message: "Invalid channel number".to_string(),
                });
            };
            self.moves.push((from, to));
            let channel = self.channels.remove(from_index);
            self.channels.insert(to_index, channel);
            self.renumber();
            Ok((from, to))
        }
    }

    #[tokio::test]
    async fn test_move_after_last() {
        let mut store = FakeStore::new(&["A", "B", "C"]);
        let request = RepositionRequest::new(id("A"), id("C")).after();

        let moves = reposition(&mut store, &request).await.unwrap();
        assert!(moves <= 2);
        assert_eq!(store.names(), vec!["B", "C", "A"]);
    }

    #[tokio::test]
    async fn test_wrong_side_is_corrected_once() {
        let mut store = FakeStore::new(&["A", "B", "C"]);
        let request = RepositionRequest::new(id("A"), id("C"));

        assert_eq!(reposition(&mut store, &request).await.unwrap(), 2);
        assert_eq!(store.names(), vec!["B", "A", "C"]);
        assert_eq!(store.moves, vec![(1, 3), (3, 2)]);
    }

    #[tokio::test]
    async fn test_move_upwards() {
        let mut store = FakeStore::new(&["A", "B", "C", "D"]);
        let request = RepositionRequest::new(id("D"), id("A")).after();

        assert_eq!(reposition(&mut store, &request).await.unwrap(), 2);
        assert_eq!(store.names(), vec!["A", "D", "B", "C"]);
    }

    #[tokio::test]
    async fn test_emptying_group_is_conflict() {
        let mut store = FakeStore::new(&["A", ":G1", "B", "C"]);
        let request = RepositionRequest::new(id("A"), id("C")).after();

        let err = reposition(&mut store, &request).await.unwrap_err();
        assert!(matches!(err, SvdrpError::Conflict(_)));
        assert!(store.moves.is_empty());

        let mut store = FakeStore::new(&[":G1", "A", ":G2", "B", "C"]);
        let request = RepositionRequest::new(id("A"), id("C"));
        assert!(matches!(
            reposition(&mut store, &request).await,
            Err(SvdrpError::Conflict(_))
        ));

        let mut store = FakeStore::new(&[":G1", "A", "B", ":G2", "C"]);
        let request = RepositionRequest::new(id("C"), id("A"));
        assert!(matches!(
            reposition(&mut store, &request).await,
            Err(SvdrpError::Conflict(_))
        ));
        assert!(store.moves.is_empty());
    }

    #[tokio::test]
    async fn test_allow_breaking_groups() {
        let mut store = FakeStore::new(&["A", ":G1", "B", "C"]);
        let request = RepositionRequest::new(id("A"), id("C"))
            .after()
            .allow_breaking_groups();

        reposition(&mut store, &request).await.unwrap();
        assert_eq!(store.names(), vec![":G1", "B", "C", "A"]);
    }

    #[tokio::test]
    async fn test_separator_cannot_be_moved() {
        let mut store = FakeStore::new(&[":G1", "A", "B", ":G2", "C", "D"]);
        let request = RepositionRequest::new("GROUP2", id("A"));

        let err = reposition(&mut store, &request).await.unwrap_err();
        assert_eq!(
            err,
            SvdrpError::Conflict("group separators cannot be moved".to_string())
        );
        assert!(store.moves.is_empty());
    }

    #[tokio::test]
    async fn test_separator_target_is_redirected() {
        // after GROUP2 means before its first channel
        let mut store = FakeStore::new(&[":G1", "A", "B", ":G2", "C", "D"]);
        let request = RepositionRequest::new(id("D"), "GROUP2").after();

        assert_eq!(reposition(&mut store, &request).await.unwrap(), 1);
        assert_eq!(store.names(), vec![":G1", "A", "B", ":G2", "D", "C"]);

        // before GROUP2 means after the last channel of the group above
        let mut store = FakeStore::new(&[":G1", "A", "B", ":G2", "C", "D"]);
        let request = RepositionRequest::new(id("A"), "GROUP2");

        reposition(&mut store, &request).await.unwrap();
        assert_eq!(store.names(), vec![":G1", "B", "A", ":G2", "C", "D"]);
    }

    #[tokio::test]
    async fn test_unknown_ids_are_conflicts() {
        let mut store = FakeStore::new(&["A", "B"]);

        let request = RepositionRequest::new("S19.2E-1-1-1", id("B"));
        match reposition(&mut store, &request).await {
            Err(SvdrpError::Conflict(message)) => assert!(message.contains("source id")),
            other => panic!("unexpected result: {:?}", other),
        }

        let request = RepositionRequest::new(id("A"), "GROUP7");
        match reposition(&mut store, &request).await {
            Err(SvdrpError::Conflict(message)) => assert!(message.contains("target id")),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(store.moves.is_empty());
    }

    #[tokio::test]
    async fn test_separator_at_end_has_no_neighbour() {
        let mut store = FakeStore::new(&["A", "B", "C", ":Empty"]);
        let request = RepositionRequest::new(id("A"), "GROUP1").after();

        assert!(matches!(
            reposition(&mut store, &request).await,
            Err(SvdrpError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_single_channel_is_already_in_place() {
        let mut store = FakeStore::new(&["A"]);
        let request = RepositionRequest::new(id("A"), id("A")).after();

        assert_eq!(reposition(&mut store, &request).await.unwrap(), 0);
        assert!(store.moves.is_empty());
    }
}
