use std::fmt::Display;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Container {
    Matroska,
    MP4,
    Ogg,
    QuickTime,
    WebM,
}

impl Display for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Container::Matroska => "matroska",
            Container::MP4 => "mp4",
            Container::Ogg => "ogg",
            Container::QuickTime => "mov",
            Container::WebM => "webm",
        };
        write!(f, "{}", name)
    }
}

impl Container {
    pub fn extension(container: Container) -> &'static str {
        match container {
            Container::Matroska => "mkv",
            Container::MP4 => "mp4",
            Container::Ogg => "ogv",
            Container::QuickTime => "mov",
            Container::WebM => "webm",
        }
    }
}
