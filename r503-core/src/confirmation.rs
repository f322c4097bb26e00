//! Confirmation codes returned in acknowledge packets

use std::fmt;

/// First payload byte of every acknowledge packet
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ConfirmationCode {
    Ok,
    PacketReceiveError,
    NoFinger,
    ImageFail,
    ImageMessy,
    FeatureFail,
    NoMatch,
    NotFound,
    EnrollMismatch,
    BadLocation,
    DbReadFail,
    UploadFeatureFail,
    PacketResponseFail,
    UploadFail,
    DeleteFail,
    DbClearFail,
    PasswordFail,
    InvalidImage,
    FlashError,
    InvalidRegister,
    AddressError,
    PasswordRequired,
    Unknown(u8),
}

impl ConfirmationCode {
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }

    /// Raw code as sent on the wire
    pub fn code(self) -> u8 {
        match self {
            Self::Ok => 0x00,
            Self::PacketReceiveError => 0x01,
            Self::NoFinger => 0x02,
            Self::ImageFail => 0x03,
            Self::ImageMessy => 0x06,
            Self::FeatureFail => 0x07,
            Self::NoMatch => 0x08,
            Self::NotFound => 0x09,
            Self::EnrollMismatch => 0x0A,
            Self::BadLocation => 0x0B,
            Self::DbReadFail => 0x0C,
            Self::UploadFeatureFail => 0x0D,
            Self::PacketResponseFail => 0x0E,
            Self::UploadFail => 0x0F,
            Self::DeleteFail => 0x10,
            Self::DbClearFail => 0x11,
            Self::PasswordFail => 0x13,
            Self::InvalidImage => 0x15,
            Self::FlashError => 0x18,
            Self::InvalidRegister => 0x1A,
            Self::AddressError => 0x20,
            Self::PasswordRequired => 0x21,
            Self::Unknown(code) => code,
        }
    }

    fn description(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::PacketReceiveError => "error receiving packet",
            Self::NoFinger => "no finger on sensor",
            Self::ImageFail => "failed to enroll the finger image",
            Self::ImageMessy => "image too disorderly to generate a template",
            Self::FeatureFail => "too few feature points to generate a template",
            Self::NoMatch => "fingers do not match",
            Self::NotFound => "no matching finger in the library",
            Self::EnrollMismatch => "failed to combine the character files",
            Self::BadLocation => "slot beyond the library range",
            Self::DbReadFail => "error reading template from the library",
            Self::UploadFeatureFail => "error uploading template",
            Self::PacketResponseFail => "module cannot receive the following data packets",
            Self::UploadFail => "error uploading image",
            Self::DeleteFail => "failed to delete the template",
            Self::DbClearFail => "failed to clear the library",
            Self::PasswordFail => "wrong password",
            Self::InvalidImage => "no valid primary image in the buffer",
            Self::FlashError => "error writing flash",
            Self::InvalidRegister => "invalid register number",
            Self::AddressError => "wrong address code",
            Self::PasswordRequired => "password must be verified",
            Self::Unknown(_) => "unknown confirmation code",
        }
    }
}

impl From<u8> for ConfirmationCode {
    fn from(code: u8) -> Self {
        match code {
            0x00 => Self::Ok,
            0x01 => Self::PacketReceiveError,
            0x02 => Self::NoFinger,
            0x03 => Self::ImageFail,
            0x06 => Self::ImageMessy,
            0x07 => Self::FeatureFail,
            0x08 => Self::NoMatch,
            0x09 => Self::NotFound,
            0x0A => Self::EnrollMismatch,
            0x0B => Self::BadLocation,
            0x0C => Self::DbReadFail,
            0x0D => Self::UploadFeatureFail,
            0x0E => Self::PacketResponseFail,
            0x0F => Self::UploadFail,
            0x10 => Self::DeleteFail,
            0x11 => Self::DbClearFail,
            0x13 => Self::PasswordFail,
            0x15 => Self::InvalidImage,
            0x18 => Self::FlashError,
            0x1A => Self::InvalidRegister,
            0x20 => Self::AddressError,
            0x21 => Self::PasswordRequired,
            other => Self::Unknown(other),
        }
    }
}

impl From<ConfirmationCode> for u8 {
    fn from(code: ConfirmationCode) -> u8 {
        code.code()
    }
}

impl fmt::Display for ConfirmationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:02X})", self.description(), self.code())
    }
}
