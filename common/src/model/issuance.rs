/// Stages an issuance request moves through.
///
/// `Validating → Numbering → Rendering → Persisting → Done`; `Failed` can be
/// reached from every stage except `Done`. Bulk requests run the
/// `Numbering..Persisting` part once per recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssuanceStage {
    Validating,
    Numbering,
    Rendering,
    Persisting,
    Done,
    Failed,
}

impl IssuanceStage {
    /// The stage that follows a successful completion of `self`.
    ///
    /// `Persisting` loops back to `Numbering` while recipients remain.
    pub fn next(self, recipients_left: bool) -> IssuanceStage {
        match self {
            IssuanceStage::Validating => IssuanceStage::Numbering,
            IssuanceStage::Numbering => IssuanceStage::Rendering,
            IssuanceStage::Rendering => IssuanceStage::Persisting,
            IssuanceStage::Persisting if recipients_left => IssuanceStage::Numbering,
            IssuanceStage::Persisting => IssuanceStage::Done,
            IssuanceStage::Done => IssuanceStage::Done,
            IssuanceStage::Failed => IssuanceStage::Failed,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, IssuanceStage::Done | IssuanceStage::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_a_two_recipient_batch() {
        let mut stage = IssuanceStage::Validating;
        let mut seen = vec![stage];
        let mut left = 2;
        while !stage.is_terminal() {
            if stage == IssuanceStage::Persisting {
                left -= 1;
            }
            stage = stage.next(left > 0);
            seen.push(stage);
        }
        assert_eq!(
            seen,
            vec![
                IssuanceStage::Validating,
                IssuanceStage::Numbering,
                IssuanceStage::Rendering,
                IssuanceStage::Persisting,
                IssuanceStage::Numbering,
                IssuanceStage::Rendering,
                IssuanceStage::Persisting,
                IssuanceStage::Done,
            ]
        );
    }

    #[test]
    fn terminal_stages_stay_put() {
        assert_eq!(IssuanceStage::Done.next(true), IssuanceStage::Done);
        assert_eq!(IssuanceStage::Failed.next(false), IssuanceStage::Failed);
    }
}
