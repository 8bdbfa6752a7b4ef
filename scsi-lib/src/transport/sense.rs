//! Classification of REQUEST SENSE data into the four dispositions the Drive Lifecycle Engine
//! acts on (spec §4.2, §9): go on, retry, fail, or medium not present.

use crate::scsi::sense_codes::{
    GeneralMediaAccessError, HardwareFailure, MMCError, NonATAPIEnvironmentError, ProtocolError,
    ReadingError, ReadinessError, UnitAttentionCondition, WritingError,
};

/// Decoded (sense key, ASC, ASCQ) triple, independent of whether the sense buffer used the
/// fixed (0x70/0x71) or descriptor (0x72/0x73) format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SenseTriple {
    pub key: u8,
    pub asc: u8,
    pub ascq: u8,
}

impl SenseTriple {
    /// Parse a raw sense buffer, returning `None` if it is empty or carries no error (response
    /// code 0x00/0x01 "no sense").
    pub fn parse(sense: &[u8]) -> Option<Self> {
        if sense.is_empty() {
            return None;
        }
        let response_code = sense[0] & 0x7F;
        match response_code {
            0x70 | 0x71 if sense.len() >= 14 => Some(SenseTriple {
                key: sense[2] & 0x0F,
                asc: sense[12],
                ascq: sense[13],
            }),
            0x72 | 0x73 if sense.len() >= 4 => Some(SenseTriple {
                key: sense[1] & 0x0F,
                asc: sense[2],
                ascq: sense[3],
            }),
            _ => None,
        }
    }

    pub fn decode(&self) -> Option<MMCError> {
        MMCError::from_codes(self.key, self.asc, self.ascq)
    }
}

/// What the Drive Lifecycle Engine should do about one command outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// No error, or an error the caller can disregard and proceed.
    GoOn,
    /// Transient condition; retry under the command's backoff policy.
    Retry,
    /// Unrecoverable for this command; surface to the caller.
    Fail,
    /// No medium in the drive at all.
    MediumNotPresent,
}

/// Classify one command's transport outcome.
///
/// `check_condition` with no decodable sense, or sense the table doesn't recognize, is treated
/// conservatively as `Fail` rather than silently swallowed.
pub fn classify(check_condition: bool, sense: &[u8]) -> Category {
    if !check_condition {
        return Category::GoOn;
    }

    let Some(triple) = SenseTriple::parse(sense) else {
        return Category::Fail;
    };

    let Some(decoded) = triple.decode() else {
        return Category::Fail;
    };

    match decoded {
        MMCError::ReadinessError(ReadinessError::MediumNotPresent)
        | MMCError::ReadinessError(ReadinessError::MediumNotPresentTrayClosed)
        | MMCError::ReadinessError(ReadinessError::MediumNotPresentTrayOpen) => {
            Category::MediumNotPresent
        }

        MMCError::ReadinessError(ReadinessError::LogicalUnitNotReadyCauseNotReportable)
        | MMCError::ReadinessError(ReadinessError::LogicalUnitIsInProcessOfBecomingReady)
        | MMCError::ReadinessError(ReadinessError::LogicalUnitNotReadyInitializingCmdRequired)
        | MMCError::ReadinessError(ReadinessError::LogicalUnitNotReadyFormatInProgress)
        | MMCError::ReadinessError(ReadinessError::LogicalUnitNotReadyOperationInProgress)
        | MMCError::ReadinessError(ReadinessError::LogicalUnitNotReadyLongWriteInProgress)
        | MMCError::UnitAttentionCondition(UnitAttentionCondition::NotReadyToReadyChangeMediumMayHaveChanged)
        | MMCError::UnitAttentionCondition(UnitAttentionCondition::PowerOnResetOrBusDeviceResetOccured)
        | MMCError::UnitAttentionCondition(UnitAttentionCondition::PowerOnOccured)
        | MMCError::UnitAttentionCondition(UnitAttentionCondition::BusResetOccured)
        | MMCError::UnitAttentionCondition(UnitAttentionCondition::BusDeviceResetFunctionOccured)
        | MMCError::UnitAttentionCondition(UnitAttentionCondition::DeviceInternalReset) => {
            Category::Retry
        }

        MMCError::UnitAttentionCondition(_) => Category::GoOn,

        MMCError::GeneralMediaAccessError(GeneralMediaAccessError::TrackFollowingError)
        | MMCError::GeneralMediaAccessError(GeneralMediaAccessError::TrackingServoFailure)
        | MMCError::GeneralMediaAccessError(GeneralMediaAccessError::FocusServoFailure)
        | MMCError::GeneralMediaAccessError(GeneralMediaAccessError::SpindleServoFailure)
        | MMCError::GeneralMediaAccessError(GeneralMediaAccessError::RandomPositioningError)
        | MMCError::GeneralMediaAccessError(GeneralMediaAccessError::MechanicalPositioningError) => {
            Category::Retry
        }

        // Sense key 1 ("recovered error") within these two families: the command still
        // completed, just not cleanly. Spec §4.2 "GO_ON: no error or recovered-error (key 1)".
        MMCError::ReadingError(ReadingError::RecoveredDataWithNoErrorCorrectionApplied)
        | MMCError::ReadingError(ReadingError::RecoveredDataWithRetries)
        | MMCError::ReadingError(ReadingError::RecoveredDataWithPositiveHeadOffset)
        | MMCError::ReadingError(ReadingError::RecoveredDataWithNegativeHeadOffset)
        | MMCError::ReadingError(ReadingError::RecoveredDataWithRetriesAndOrcIrcApplied)
        | MMCError::ReadingError(ReadingError::RecoveredDataUsingPreviousSectorId)
        | MMCError::ReadingError(ReadingError::RecoveredDataWithoutEccRecommendReassignment)
        | MMCError::ReadingError(ReadingError::RecoveredDataWithoutEccRecommendRewrite)
        | MMCError::ReadingError(ReadingError::RecoveredDataWithoutEccDataRewritten)
        | MMCError::ReadingError(ReadingError::RecoveredDataWithErrorCorrectionApplied)
        | MMCError::ReadingError(ReadingError::RecoveredDataWithErrorCorrRetriesApplied)
        | MMCError::ReadingError(ReadingError::RecoveredDataDataAutoReallocated)
        | MMCError::ReadingError(ReadingError::RecoveredDataWithCirc)
        | MMCError::ReadingError(ReadingError::RecoveredDataWithLEC)
        | MMCError::ReadingError(ReadingError::RecoveredDataRecommendReassignment)
        | MMCError::ReadingError(ReadingError::RecoveredDataRecommendRewrite)
        | MMCError::ReadingError(ReadingError::RecoveredDataWithLinking)
        | MMCError::WritingError(WritingError::FailurePredictionThresholdExceeded)
        | MMCError::WritingError(WritingError::MediaFailurePredictionThresholdExceeded)
        | MMCError::WritingError(WritingError::LogicalUnitFailurePredictionThresholdExceeded)
        | MMCError::WritingError(WritingError::FailurePredictionThresholdExceededPredictedSpareAreaExhaustion)
        | MMCError::WritingError(WritingError::FailurePredictionThresholdExceededFalse)
        | MMCError::WritingError(WritingError::PowerCalibrationAreaAlmostFull)
        | MMCError::WritingError(WritingError::RmaPmaIsAlmostFull) => Category::GoOn,

        // "2/08/*" (spec §4.2's own enumerated transient list) reported against a logical unit
        // rather than a peripheral device — distinct from the sk=4 hardware-failure variants of
        // the same ASC below.
        MMCError::ReadingError(ReadingError::LogicalUnitCommunicationFailureNotReady)
        | MMCError::ReadingError(ReadingError::LogicalUnitCommunicationTimeoutNotReady)
        | MMCError::ReadingError(ReadingError::LogicalUnitCommunicationParityErrorNotReady)
        | MMCError::ReadingError(ReadingError::LogicalUnitCommunicationCrcErrorUltraDmaNotReady) => {
            Category::Retry
        }

        MMCError::ReadingError(_) | MMCError::WritingError(_) => Category::Fail,

        MMCError::HardwareFailure(_) => Category::Fail,

        MMCError::ProtocolError(ProtocolError::CommandSequenceError) => Category::Fail,

        MMCError::NonATAPIEnvironmentError(_) => Category::Fail,

        _ => Category::Fail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_check_condition_goes_on() {
        assert_eq!(classify(false, &[]), Category::GoOn);
    }

    #[test]
    fn fixed_format_medium_not_present() {
        let mut sense = [0u8; 18];
        sense[0] = 0x70;
        sense[2] = 0x02;
        sense[12] = 0x3A;
        sense[13] = 0x00;
        assert_eq!(classify(true, &sense), Category::MediumNotPresent);
    }

    #[test]
    fn descriptor_format_not_ready_retries() {
        let sense = [0x72, 0x02, 0x04, 0x01];
        assert_eq!(classify(true, &sense), Category::Retry);
    }

    #[test]
    fn unrecognized_sense_fails_closed() {
        let mut sense = [0u8; 18];
        sense[0] = 0x70;
        sense[2] = 0x0B;
        sense[12] = 0xFF;
        sense[13] = 0xFF;
        assert_eq!(classify(true, &sense), Category::Fail);
    }

    #[test]
    fn sense_key_1_recovered_error_goes_on() {
        // 1/17/01 RECOVERED DATA WITH RETRIES.
        let mut sense = [0u8; 18];
        sense[0] = 0x70;
        sense[2] = 0x01;
        sense[12] = 0x17;
        sense[13] = 0x01;
        assert_eq!(classify(true, &sense), Category::GoOn);
    }

    #[test]
    fn logical_unit_communication_failure_not_ready_retries() {
        // 2/08/00, distinct from the sk=4 HardwareFailure variant of the same ASC.
        let mut sense = [0u8; 18];
        sense[0] = 0x70;
        sense[2] = 0x02;
        sense[12] = 0x08;
        sense[13] = 0x00;
        assert_eq!(classify(true, &sense), Category::Retry);
    }
}
