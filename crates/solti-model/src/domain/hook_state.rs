use serde::{Deserialize, Serialize};

/// Persisted outcome of a hook's pre-start run.
///
/// A hook without an entry has never produced state. Once an entry is [`HookState::Done`] the hook's
/// one-time setup is complete and later pre-start passes must skip it.
///
/// On disk the state is the flat record `{"data": [...], "done": bool}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "HookStateRecord", into = "HookStateRecord")]
pub enum HookState {
    /// Hook ran and left data behind, but must run again on the next pass.
    Pending { data: Vec<u8> },
    /// Hook finished its one-time setup.
    Done { data: Vec<u8> },
}

impl HookState {
    pub fn new(data: Vec<u8>, done: bool) -> Self {
        if done {
            HookState::Done { data }
        } else {
            HookState::Pending { data }
        }
    }

    #[inline]
    pub fn is_done(&self) -> bool {
        matches!(self, HookState::Done { .. })
    }

    pub fn data(&self) -> &[u8] {
        match self {
            HookState::Pending { data } | HookState::Done { data } => data,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct HookStateRecord {
    #[serde(default)]
    data: Vec<u8>,
    #[serde(default)]
    done: bool,
}

impl From<HookStateRecord> for HookState {
    fn from(r: HookStateRecord) -> Self {
        HookState::new(r.data, r.done)
    }
}

impl From<HookState> for HookStateRecord {
    fn from(s: HookState) -> Self {
        let done = s.is_done();
        match s {
            HookState::Pending { data } | HookState::Done { data } => HookStateRecord { data, done },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_picks_variant_from_flag() {
        assert!(HookState::new(vec![1], true).is_done());
        assert!(!HookState::new(vec![1], false).is_done());
        assert_eq!(HookState::new(vec![7, 8], true).data(), &[7, 8]);
    }

    #[test]
    fn persisted_layout_is_data_and_done() {
        let json = serde_json::to_value(HookState::Done { data: vec![1, 2] }).unwrap();
        assert_eq!(json, serde_json::json!({ "data": [1, 2], "done": true }));

        let back: HookState = serde_json::from_value(json).unwrap();
        assert_eq!(back, HookState::Done { data: vec![1, 2] });
    }

    #[test]
    fn missing_fields_default_to_pending() {
        let s: HookState = serde_json::from_str("{}").unwrap();
        assert_eq!(s, HookState::Pending { data: vec![] });
    }
}
