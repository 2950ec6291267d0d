use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PowerState {
    On,
    Off,
    Unavailable,
}

impl PowerState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::On => "ON",
            Self::Off => "OFF",
            Self::Unavailable => "UNAVAILABLE",
        }
    }
}

impl Default for PowerState {
    fn default() -> Self {
        Self::Off
    }
}

/// Input connectors the vendor protocol can switch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    Hdmi1,
    Hdmi2,
    Hdmi3,
    Vga,
    Dvi,
    Component,
    UsbC,
    SVideo,
}

impl InputSource {
    /// Resolves the dashboard's display name for an input connector.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "HDMI 1" => Some(Self::Hdmi1),
            "HDMI 2" => Some(Self::Hdmi2),
            "HDMI 3" => Some(Self::Hdmi3),
            "VGA" => Some(Self::Vga),
            "DVI" => Some(Self::Dvi),
            "Component" => Some(Self::Component),
            "USB-C" => Some(Self::UsbC),
            "S-Video" => Some(Self::SVideo),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hdmi1 => "HDMI 1",
            Self::Hdmi2 => "HDMI 2",
            Self::Hdmi3 => "HDMI 3",
            Self::Vga => "VGA",
            Self::Dvi => "DVI",
            Self::Component => "Component",
            Self::UsbC => "USB-C",
            Self::SVideo => "S-Video",
        }
    }
}
