use crate::domain::ports::AuthPrompt;
use std::io::{self, BufRead, BufReader, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Mutex, OnceLock};
use std::time::Duration;
use url::Url;

type Line = io::Result<Option<String>>;
type Source = Box<dyn BufRead + Send>;

/// 終端機提示：網址印到 stderr，授權碼從 stdin 讀一行
///
/// A single background thread owns the input and forwards each line over a
/// channel, so a prompt that expired never keeps a reader blocked on stdin.
/// Lines typed after an earlier prompt expired are discarded before the next
/// wait begins.
#[derive(Default)]
pub struct StdinPrompt {
    source: Mutex<Option<Source>>,
    lines: OnceLock<Mutex<Receiver<Line>>>,
}

impl StdinPrompt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads codes from `reader` instead of stdin.
    pub fn from_reader<R: BufRead + Send + 'static>(reader: R) -> Self {
        Self {
            source: Mutex::new(Some(Box::new(reader))),
            lines: OnceLock::new(),
        }
    }

    fn lines(&self) -> &Mutex<Receiver<Line>> {
        self.lines.get_or_init(|| {
            let source = self
                .source
                .lock()
                .ok()
                .and_then(|mut source| source.take())
                .unwrap_or_else(|| Box::new(BufReader::new(io::stdin())));
            Mutex::new(spawn_reader(source))
        })
    }
}

fn spawn_reader(mut source: Source) -> Receiver<Line> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || loop {
        let line = read_line_from(&mut source);
        let finished = !matches!(line, Ok(Some(_)));
        if tx.send(line).is_err() || finished {
            break;
        }
    });
    rx
}

impl AuthPrompt for StdinPrompt {
    fn present(&self, authorization_url: &Url) {
        let mut stderr = io::stderr().lock();
        let _ = writeln!(stderr, "Open this URL in a browser and grant access:");
        let _ = writeln!(stderr, "\n    {}\n", authorization_url);
        let _ = write!(stderr, "Paste the authorization code (or the full redirect URL): ");
        let _ = stderr.flush();
    }

    fn read_code(&self, timeout: Duration) -> io::Result<Option<String>> {
        let lines = self
            .lines()
            .lock()
            .map_err(|_| io::Error::other("authorization code reader is poisoned"))?;

        loop {
            match lines.try_recv() {
                Ok(Ok(Some(_))) => {
                    tracing::debug!("Discarding input entered after an earlier prompt expired")
                }
                Ok(other) => return other,
                Err(_) => break,
            }
        }

        match lines.recv_timeout(timeout) {
            Ok(line) => line,
            Err(RecvTimeoutError::Timeout) => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "no authorization code entered in time",
            )),
            Err(RecvTimeoutError::Disconnected) => Ok(None),
        }
    }
}

/// EOF 代表使用者放棄輸入
fn read_line_from<R: BufRead + ?Sized>(reader: &mut R) -> Line {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::sync::mpsc::Sender;
    use tokio_test::{assert_err, assert_ok};

    /// Blocking reader fed by the test, like a terminal the user types into.
    struct Keyboard {
        keys: Receiver<Vec<u8>>,
        pending: Vec<u8>,
    }

    impl Read for Keyboard {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.pending.is_empty() {
                match self.keys.recv() {
                    Ok(bytes) => self.pending = bytes,
                    Err(_) => return Ok(0),
                }
            }
            let n = buf.len().min(self.pending.len());
            buf[..n].copy_from_slice(&self.pending[..n]);
            self.pending.drain(..n);
            Ok(n)
        }
    }

    fn keyboard() -> (Sender<Vec<u8>>, StdinPrompt) {
        let (tx, keys) = mpsc::channel();
        let reader = BufReader::new(Keyboard {
            keys,
            pending: Vec::new(),
        });
        (tx, StdinPrompt::from_reader(reader))
    }

    #[test]
    fn test_reads_one_trimmed_line() {
        let prompt = StdinPrompt::from_reader(io::Cursor::new("  AQTx-code  \nsecond line\n"));
        assert_eq!(
            assert_ok!(prompt.read_code(Duration::from_secs(1))),
            Some("AQTx-code".to_string())
        );
    }

    #[test]
    fn test_eof_is_no_code() {
        let prompt = StdinPrompt::from_reader(io::empty());
        assert_eq!(assert_ok!(prompt.read_code(Duration::from_secs(1))), None);
        assert_eq!(assert_ok!(prompt.read_code(Duration::from_secs(1))), None);
    }

    #[test]
    fn test_expired_wait_does_not_swallow_the_next_code() {
        let (keys, prompt) = keyboard();

        let expired = assert_err!(prompt.read_code(Duration::from_millis(50)));
        assert_eq!(expired.kind(), io::ErrorKind::TimedOut);

        // 逾時之後才貼上的舊授權碼不屬於下一次提示
        keys.send(b"late-code\n".to_vec()).unwrap();
        std::thread::sleep(Duration::from_millis(100));

        let typist = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            keys.send(b"fresh-code\n".to_vec()).unwrap();
            keys
        });
        assert_eq!(
            assert_ok!(prompt.read_code(Duration::from_secs(5))),
            Some("fresh-code".to_string())
        );
        drop(typist.join().unwrap());
    }
}
