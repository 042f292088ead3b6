use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 投递渠道
///
/// 声明顺序即投递顺序: Email -> Sms -> WhatsApp
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Sms,
    #[serde(rename = "whatsapp")]
    WhatsApp,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Email, Channel::Sms, Channel::WhatsApp];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::Sms => "sms",
            Channel::WhatsApp => "whatsapp",
        }
    }

    /// 该渠道使用的联系人字段名
    pub fn contact_field(&self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::Sms | Channel::WhatsApp => "phone",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "email" | "mail" => Ok(Channel::Email),
            "sms" => Ok(Channel::Sms),
            "whatsapp" => Ok(Channel::WhatsApp),
            other => Err(format!("unknown channel: {}", other)),
        }
    }
}

/// 启用的渠道集合，迭代顺序固定为 Email -> Sms -> WhatsApp
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Channel>", into = "Vec<Channel>")]
pub struct ChannelSet {
    email: bool,
    sms: bool,
    whatsapp: bool,
}

impl ChannelSet {
    pub fn email_only() -> Self {
        Self { email: true, ..Self::default() }
    }

    pub fn insert(&mut self, channel: Channel) {
        match channel {
            Channel::Email => self.email = true,
            Channel::Sms => self.sms = true,
            Channel::WhatsApp => self.whatsapp = true,
        }
    }

    pub fn contains(&self, channel: Channel) -> bool {
        match channel {
            Channel::Email => self.email,
            Channel::Sms => self.sms,
            Channel::WhatsApp => self.whatsapp,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.email || self.sms || self.whatsapp)
    }

    pub fn iter(&self) -> impl Iterator<Item = Channel> + '_ {
        Channel::ALL.into_iter().filter(|c| self.contains(*c))
    }
}

impl FromIterator<Channel> for ChannelSet {
    fn from_iter<I: IntoIterator<Item = Channel>>(iter: I) -> Self {
        let mut set = ChannelSet::default();
        for channel in iter {
            set.insert(channel);
        }
        set
    }
}

impl From<Vec<Channel>> for ChannelSet {
    fn from(channels: Vec<Channel>) -> Self {
        channels.into_iter().collect()
    }
}

impl From<ChannelSet> for Vec<Channel> {
    fn from(set: ChannelSet) -> Self {
        set.iter().collect()
    }
}
