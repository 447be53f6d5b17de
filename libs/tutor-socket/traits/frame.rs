use tokio_tungstenite::tungstenite::Message;

/// One discrete unit of data exchanged over the connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

impl Frame {
    /// Get the frame as text, if it is text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Frame::Text(s) => Some(s),
            Frame::Binary(_) => None,
        }
    }

    /// Get the frame as binary, if it is binary
    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            Frame::Text(_) => None,
            Frame::Binary(b) => Some(b),
        }
    }

    /// Payload length in bytes
    pub fn len(&self) -> usize {
        match self {
            Frame::Text(s) => s.len(),
            Frame::Binary(b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert a tungstenite message into a frame.
    ///
    /// Control messages (ping, pong, close, raw frames) carry no payload for
    /// the session and map to `None`.
    pub fn from_message(msg: Message) -> Option<Self> {
        match msg {
            Message::Text(text) => Some(Frame::Text(text)),
            Message::Binary(data) => Some(Frame::Binary(data)),
            Message::Ping(_) | Message::Pong(_) | Message::Close(_) | Message::Frame(_) => None,
        }
    }
}

impl From<Frame> for Message {
    fn from(frame: Frame) -> Self {
        match frame {
            Frame::Text(text) => Message::Text(text),
            Frame::Binary(data) => Message::Binary(data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_messages_carry_no_frame() {
        assert!(Frame::from_message(Message::Ping(vec![1])).is_none());
        assert!(Frame::from_message(Message::Pong(vec![])).is_none());
        assert!(Frame::from_message(Message::Close(None)).is_none());
    }

    #[test]
    fn data_messages_convert_both_ways() {
        let text = Frame::from_message(Message::Text("hi".into())).unwrap();
        assert_eq!(text.as_text(), Some("hi"));
        assert!(text.as_binary().is_none());

        let bin = Frame::Binary(vec![1, 2, 3]);
        assert_eq!(bin.len(), 3);
        assert!(matches!(Message::from(bin), Message::Binary(b) if b == vec![1, 2, 3]));
    }
}
