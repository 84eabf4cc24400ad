use std::fmt::Display;

use crate::containers::Container;

/// Video codec choices offered to the user. Anything else is kept as
/// `Unknown` and falls back to the engine defaults.
#[derive(Clone, Debug, PartialEq)]
pub enum Codec {
    Unknown(String),
    X264,
    OpenH264,
    X265,
    Xvid,
    Vp8,
    Vp9,
    Aom,
    Kvazaar,
    Theora,
    Hap,
}

impl Codec {
    pub const ALL: [Codec; 10] = [
        Codec::X264,
        Codec::OpenH264,
        Codec::X265,
        Codec::Xvid,
        Codec::Vp8,
        Codec::Vp9,
        Codec::Aom,
        Codec::Kvazaar,
        Codec::Theora,
        Codec::Hap,
    ];

    pub fn from_label(s: &str) -> Self {
        match s {
            "x264" => Codec::X264,
            "openh264" => Codec::OpenH264,
            "x265" => Codec::X265,
            "xvid" => Codec::Xvid,
            "vp8" => Codec::Vp8,
            "vp9" => Codec::Vp9,
            "aom" => Codec::Aom,
            "kvazaar" => Codec::Kvazaar,
            "theora" => Codec::Theora,
            "hap" => Codec::Hap,
            _ => Codec::Unknown(String::from(s)),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Codec::Unknown(label) => label,
            Codec::X264 => "x264",
            Codec::OpenH264 => "openh264",
            Codec::X265 => "x265",
            Codec::Xvid => "xvid",
            Codec::Vp8 => "vp8",
            Codec::Vp9 => "vp9",
            Codec::Aom => "aom",
            Codec::Kvazaar => "kvazaar",
            Codec::Theora => "theora",
            Codec::Hap => "hap",
        }
    }

    /// Value for `-c:v`. Empty means "let ffmpeg pick".
    pub fn encoder(&self) -> &'static str {
        match self {
            Codec::X264 => "libx264",
            Codec::OpenH264 => "libopenh264",
            Codec::X265 => "libx265",
            Codec::Xvid => "libxvid",
            Codec::Vp8 => "libvpx",
            Codec::Vp9 => "libvpx-vp9",
            Codec::Aom => "libaom-av1",
            Codec::Kvazaar => "libkvazaar",
            Codec::Theora => "libtheora",
            Codec::Hap | Codec::Unknown(_) => "",
        }
    }

    pub fn container(&self) -> Container {
        match self {
            Codec::Vp8 | Codec::Vp9 => Container::WebM,
            Codec::Aom => Container::Matroska,
            Codec::Theora => Container::Ogg,
            Codec::Hap => Container::QuickTime,
            _ => Container::MP4,
        }
    }

    /// Extra encoder options, always with a trailing space when non-empty.
    pub fn options(&self) -> &'static str {
        match self {
            Codec::X265 => "-crf 28 -preset fast ",
            Codec::Vp8 => "-b:v 1M -crf 10 ",
            Codec::Vp9 => "-b:v 2M ",
            Codec::Aom => "-crf 30 -strict experimental ",
            Codec::Theora => "-qscale:v 7 ",
            Codec::Hap => "-format hap_q ",
            _ => "",
        }
    }

    pub fn profile(&self) -> CodecProfile {
        CodecProfile {
            encoder: self.encoder(),
            extension: Container::extension(self.container()),
            options: self.options(),
        }
    }
}

impl Default for Codec {
    fn default() -> Self {
        Codec::Unknown(String::new())
    }
}

impl Display for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CodecProfile {
    pub encoder: &'static str,
    pub extension: &'static str,
    pub options: &'static str,
}
