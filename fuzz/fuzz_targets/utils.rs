use std::str;
use std::sync::mpsc;
use std::sync::Mutex;
use std::time::Duration;

pub const MAX_INPUT_SIZE: usize = 64 * 1024;

/// Returns a UTF-8 view of `data` truncated to `MAX_INPUT_SIZE`.
///
/// If the cut lands inside a multibyte codepoint, up to 3 trailing bytes are
/// dropped to recover.
#[inline]
pub fn truncate_utf8(data: &[u8]) -> Option<&str> {
    let cap = data.len().min(MAX_INPUT_SIZE);
    (0..=3usize.min(cap)).find_map(|trim| str::from_utf8(&data[..cap - trim]).ok())
}

/// Runs each input on a long-lived worker thread so hangs surface as
/// timeouts and panics as disconnects.
pub struct Worker {
    name: &'static str,
    timeout: Duration,
    input_tx: mpsc::SyncSender<String>,
    output_rx: Mutex<mpsc::Receiver<()>>,
}

impl Worker {
    pub fn spawn(name: &'static str, timeout: Duration, run: fn(&str)) -> Self {
        let (input_tx, input_rx) = mpsc::sync_channel::<String>(0);
        let (output_tx, output_rx) = mpsc::sync_channel::<()>(0);
        std::thread::spawn(move || {
            for input in input_rx {
                run(&input);
                let _ = output_tx.send(());
            }
        });
        Self {
            name,
            timeout,
            input_tx,
            output_rx: Mutex::new(output_rx),
        }
    }

    pub fn run(&self, text: &str) {
        let name = self.name;
        self.input_tx
            .send(text.to_owned())
            .unwrap_or_else(|_| panic!("{name} worker thread exited"));
        match self
            .output_rx
            .lock()
            .unwrap_or_else(|_| panic!("{name} worker receiver poisoned"))
            .recv_timeout(self.timeout)
        {
            Ok(()) => {}
            Err(mpsc::RecvTimeoutError::Timeout) => panic!("{name} fuzz target timed out"),
            Err(mpsc::RecvTimeoutError::Disconnected) => panic!("{name} worker thread panicked"),
        }
    }
}
