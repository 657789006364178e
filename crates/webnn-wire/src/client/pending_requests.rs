use ahash::AHashMap;
use futures_channel::oneshot;
use webnn_structures::ErrorType;

/// What an asynchronous request resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackResult {
    pub error_type: ErrorType,
    pub message: String,
}

impl CallbackResult {
    pub fn new(error_type: ErrorType, message: impl Into<String>) -> Self {
        Self {
            error_type,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error_type == ErrorType::NoError
    }
}

/// Outstanding requests of one kind on one object, keyed by request serial.
///
/// Serials count up from zero and are never reused within the table, so a late answer for a
/// resolved request can be told apart from a new one.
#[derive(Debug)]
pub struct PendingRequests<T> {
    next_serial: u64,
    requests: AHashMap<u64, oneshot::Sender<T>>,
}

impl<T> Default for PendingRequests<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PendingRequests<T> {
    pub fn new() -> Self {
        Self {
            next_serial: 0,
            requests: AHashMap::new(),
        }
    }

    /// Registers a new request and returns its serial and the receiving end of its completion.
    pub fn add(&mut self) -> (u64, oneshot::Receiver<T>) {
        let serial = self.next_serial;
        self.next_serial += 1;
        let (sender, receiver) = oneshot::channel();
        self.requests.insert(serial, sender);
        (serial, receiver)
    }

    /// Completes the request `serial`. Returns `false` if no such request is outstanding.
    ///
    /// A caller that already dropped its receiver still counts as resolved.
    pub fn resolve(&mut self, serial: u64, value: T) -> bool {
        match self.requests.remove(&serial) {
            Some(sender) => {
                let _ = sender.send(value);
                true
            }
            None => false,
        }
    }

    /// Completes every outstanding request with a value built by `make_value`.
    pub fn resolve_all(&mut self, mut make_value: impl FnMut() -> T) {
        let mut serials: Vec<u64> = self.requests.keys().copied().collect();
        serials.sort_unstable();
        for serial in serials {
            if let Some(sender) = self.requests.remove(&serial) {
                let _ = sender.send(make_value());
            }
        }
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}
