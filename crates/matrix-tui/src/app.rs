use std::sync::Arc;
use std::time::{Duration, Instant};

use matrix_core::{
    Author, ChatWidget, Config, MatrixClient, PushEvent, RainAnimator, RainCanvas, ScheduledTask,
    SurfaceSize, WidgetEvent, WidgetSettings,
};
use ratatui::layout::Rect;
use tokio::sync::mpsc::UnboundedSender;
use tracing::info;

use crate::tui::AppEvent;

pub struct App {
    // Core state
    pub should_quit: bool,
    pub server_url: String,
    pub push_connected: bool,

    // Chat
    pub widget: ChatWidget<MatrixClient>,
    pub input: String,
    pub cursor: usize, // cursor position in input, in chars
    pub chat_scroll: u16,
    pub follow_tail: bool,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations

    // Digital rain
    pub rain: RainAnimator,
    pub canvas: RainCanvas,
    rain_task: Option<ScheduledTask>,
    rain_period: Duration,
    ui_events: UnboundedSender<AppEvent>,

    // Panel areas for mouse hit-testing (updated during render)
    pub avatar_area: Option<Rect>,
    pub chat_area: Option<Rect>,
    pub send_area: Option<Rect>,
    pub voice_area: Option<Rect>,
}

impl App {
    pub fn new(
        config: &Config,
        client: MatrixClient,
        widget_events: UnboundedSender<WidgetEvent>,
        ui_events: UnboundedSender<AppEvent>,
    ) -> Self {
        let widget = ChatWidget::new(Arc::new(client), widget_events, WidgetSettings::from(config));

        let rain = RainAnimator::new(config.rain.glyph_size)
            .with_glyphs(&config.rain.glyphs)
            .with_fade(config.rain.fade)
            .with_reset_chance(config.rain.reset_chance);

        Self {
            should_quit: false,
            server_url: config.server_url.clone(),
            push_connected: false,

            widget,
            input: String::new(),
            cursor: 0,
            chat_scroll: 0,
            follow_tail: true,
            chat_height: 0,
            chat_width: 0,

            rain,
            canvas: RainCanvas::default(),
            rain_task: None,
            rain_period: config.rain.frame_interval(),
            ui_events,

            avatar_area: None,
            chat_area: None,
            send_area: None,
            voice_area: None,
        }
    }

    /// Terminal size changed: rebuild the rain surface and its columns
    pub fn resize_surface(&mut self, width: u16, height: u16) {
        let size = SurfaceSize::new(width as u32, height as u32);
        self.canvas.resize(size);
        self.rain.initialize(size);
    }

    pub fn tick_rain(&mut self) {
        let mut rng = rand::thread_rng();
        self.rain.tick(&mut self.canvas, &mut rng);
    }

    pub fn start_rain(&mut self) {
        if self.rain_running() {
            return;
        }
        let tx = self.ui_events.clone();
        self.rain_task = Some(ScheduledTask::every(self.rain_period, move || {
            tx.send(AppEvent::RainTick).is_ok()
        }));
    }

    pub fn stop_rain(&mut self) {
        if let Some(mut task) = self.rain_task.take() {
            task.stop();
        }
    }

    pub fn toggle_rain(&mut self) {
        if self.rain_running() {
            info!("digital rain paused");
            self.stop_rain();
        } else {
            info!("digital rain resumed");
            self.start_rain();
        }
    }

    pub fn rain_running(&self) -> bool {
        self.rain_task.as_ref().map_or(false, |t| t.is_running())
    }

    /// Route a push event to the widget, noting channel liveness on the way
    pub fn on_push(&mut self, event: PushEvent) {
        match event {
            PushEvent::Connected => self.push_connected = true,
            PushEvent::Disconnected => self.push_connected = false,
            _ => {}
        }
        let appends = matches!(event, PushEvent::NewMessage { .. });
        self.widget.handle(event.into());
        if appends {
            self.scroll_to_bottom();
        }
    }

    pub fn on_widget_event(&mut self, event: WidgetEvent) {
        let before = self.widget.len();
        self.widget.handle(event);
        if self.widget.len() != before {
            self.scroll_to_bottom();
        }
    }

    pub fn submit_input(&mut self) {
        if self.widget.send_message(&self.input) {
            self.input.clear();
            self.cursor = 0;
            self.scroll_to_bottom();
        }
    }

    pub fn activate_avatar(&mut self) {
        if self.widget.activate_avatar() {
            self.scroll_to_bottom();
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
        self.follow_tail = false;
    }

    pub fn scroll_down(&mut self, lines: u16) {
        let max = self.total_chat_lines().saturating_sub(self.visible_height());
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(max);
        self.follow_tail = self.chat_scroll >= max;
    }

    /// Keep the newest entry in view
    pub fn scroll_to_bottom(&mut self) {
        self.follow_tail = true;
        self.chat_scroll = self.total_chat_lines().saturating_sub(self.visible_height());
    }

    fn visible_height(&self) -> u16 {
        if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        }
    }

    pub fn total_chat_lines(&self) -> u16 {
        self.chat_lines_at(Instant::now())
    }

    /// Rendered height of the whole log. Text rows come from the full entry
    /// text so the scroll target doesn't creep while a reveal is in progress;
    /// the reveal cursor row is counted until the reveal completes.
    pub fn chat_lines_at(&self, now: Instant) -> u16 {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;
        for shown in self.widget.display_entries() {
            total_lines = total_lines.saturating_add(1); // Author line
            for line in shown.entry.text.lines() {
                total_lines = total_lines.saturating_add(wrapped_rows(line, wrap_width) as u16);
            }
            if !shown.reveal.is_complete(now) {
                total_lines = total_lines.saturating_add(1); // Reveal cursor
            }
            total_lines = total_lines.saturating_add(1); // Blank line after entry
        }
        total_lines
    }

    pub fn author_label(author: Author) -> &'static str {
        match author {
            Author::User => "You:",
            Author::Assistant => "MATRIX-AI:",
        }
    }
}

/// Rows one line takes when word-wrapped to `width`. Words longer than a
/// row are broken across rows, the way the log paragraph wraps them.
fn wrapped_rows(line: &str, width: usize) -> usize {
    let width = width.max(1);
    let mut rows = 1;
    let mut current_len = 0;

    for word in line.split_whitespace() {
        let word_len = word.chars().count();

        if current_len > 0 && current_len + 1 + word_len <= width {
            // Word fits on current line
            current_len += 1 + word_len;
            continue;
        }
        if current_len > 0 {
            // Word doesn't fit, start new line
            rows += 1;
        }
        rows += (word_len - 1) / width;
        current_len = word_len - (word_len - 1) / width * width;
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn app() -> (App, mpsc::UnboundedReceiver<AppEvent>) {
        let config = Config::new();
        let client = MatrixClient::new(&config.server_url).unwrap();
        let (widget_tx, _widget_rx) = mpsc::unbounded_channel();
        let (ui_tx, ui_rx) = mpsc::unbounded_channel();
        (App::new(&config, client, widget_tx, ui_tx), ui_rx)
    }

    #[tokio::test]
    async fn resize_recomputes_rain_columns() {
        let (mut app, _rx) = app();
        app.resize_surface(80, 24);
        assert_eq!(app.rain.columns(), 80);
        app.resize_surface(40, 10);
        assert_eq!(app.rain.columns(), 40);
        assert_eq!(app.canvas.lit_cells(), 0);

        app.tick_rain();
        assert_eq!(app.canvas.lit_cells(), 40);
    }

    #[tokio::test(start_paused = true)]
    async fn rain_clock_starts_and_stops() {
        let (mut app, mut rx) = app();
        app.start_rain();
        assert!(app.rain_running());
        assert!(matches!(rx.recv().await, Some(AppEvent::RainTick)));

        app.toggle_rain();
        assert!(!app.rain_running());
        tokio::time::sleep(Duration::from_secs(1)).await;
        while let Ok(event) = rx.try_recv() {
            assert!(matches!(event, AppEvent::RainTick));
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn push_connection_is_tracked() {
        let (mut app, _rx) = app();
        app.on_push(PushEvent::Connected);
        assert!(app.push_connected);
        app.on_push(PushEvent::NewMessage {
            assistant_response: "hi there".to_string(),
        });
        assert_eq!(app.widget.len(), 1);
        app.on_push(PushEvent::Disconnected);
        assert!(!app.push_connected);
    }

    #[test]
    fn wrapping_breaks_at_words() {
        assert_eq!(wrapped_rows("", 10), 1);
        assert_eq!(wrapped_rows("wake up", 10), 1);
        // 16 chars, but "bbbbbb" and "cccc" each push to a new row
        assert_eq!(wrapped_rows("aaaa bbbbbb cccc", 10), 3);
        assert_eq!(wrapped_rows("0123456789abc", 10), 2);
        assert_eq!(wrapped_rows("0123456789 x", 10), 2);
    }

    #[tokio::test]
    async fn wrapped_line_estimate() {
        let (mut app, _rx) = app();
        app.chat_width = 10;
        app.on_push(PushEvent::NewMessage {
            assistant_response: "0123456789abc\n\nxyz".to_string(),
        });
        let done = Instant::now() + Duration::from_secs(3600);
        // author + 2 wrapped + empty + 1 + blank
        assert_eq!(app.chat_lines_at(done), 6);
    }

    #[tokio::test]
    async fn reveal_cursor_row_is_counted_until_done() {
        let (mut app, _rx) = app();
        app.on_push(PushEvent::NewMessage {
            assistant_response: "there is no spoon".to_string(),
        });
        // author + text + cursor + blank
        assert_eq!(app.chat_lines_at(Instant::now()), 4);
        assert_eq!(app.chat_lines_at(Instant::now() + Duration::from_secs(3600)), 3);
    }

    #[tokio::test]
    async fn blank_input_is_kept() {
        let (mut app, _rx) = app();
        app.input = "   ".to_string();
        app.cursor = 3;
        app.submit_input();
        assert_eq!(app.input, "   ");
        assert!(app.widget.is_empty());
    }
}
