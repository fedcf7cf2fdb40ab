//! tracing subscriber setup.
//!
//! ブラウザでは 1 イベント 1 行で `console.log` に流す。ネイティブ（テスト）では stderr。
//! wasm32 では SystemTime が使えないのでタイムスタンプは出さない。

use tracing::Level;

/// Writer that forwards one formatted event to the browser console.
#[cfg(target_arch = "wasm32")]
struct ConsoleWriter;

#[cfg(target_arch = "wasm32")]
impl std::io::Write for ConsoleWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let text = String::from_utf8_lossy(buf);
        let line = text.trim_end();
        if !line.is_empty() {
            web_sys::console::log_1(&line.into());
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn max_level() -> Level {
    if cfg!(debug_assertions) {
        Level::DEBUG
    } else {
        Level::INFO
    }
}

/// Install the global subscriber. A second call is a no-op.
pub fn init() {
    let builder = tracing_subscriber::fmt()
        .without_time()
        .with_ansi(false)
        .with_target(false)
        .with_max_level(max_level());

    #[cfg(target_arch = "wasm32")]
    let result = builder.with_writer(|| ConsoleWriter).try_init();
    #[cfg(not(target_arch = "wasm32"))]
    let result = builder.with_writer(std::io::stderr).try_init();

    if result.is_err() {
        tracing::debug!("subscriber already installed");
    }
}
