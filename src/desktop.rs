// src/desktop.rs
use crate::coords::{FileSaveCoordinates, Point, PrintDialogCoordinates};
use crate::keyboard::{type_text, xdotool_key};
use crate::mouse::{
    ensure_xdotool, get_display_geometry, get_mouse_location, xdotool_move, xdotool_move_and_click,
    xdotool_scroll,
};
use anyhow::Result;
use std::thread::sleep;
use std::time::Duration;
use tracing::info;

/// OS-level input injection.
pub trait InputDevice {
    fn click(&self, p: Point) -> Result<()>;
    fn move_to(&self, p: Point) -> Result<()>;
    fn type_text(&self, text: &str) -> Result<()>;
    fn key(&self, combo: &str) -> Result<()>;
    fn scroll(&self, clicks: i32) -> Result<()>;
    fn position(&self) -> Result<Point>;
}

/// Input injection through `xdotool` on one X display.
#[derive(Debug, Clone)]
pub struct Xdotool {
    pub display: String,
    pub type_delay_ms: u64,
    geometry: Option<(i32, i32)>,
}

impl Xdotool {
    pub fn connect(display: &str) -> Result<Self> {
        ensure_xdotool()?;
        let geometry = get_display_geometry(display)?;
        Ok(Self {
            display: display.to_string(),
            type_delay_ms: 12,
            geometry: Some(geometry),
        })
    }

    pub fn geometry(&self) -> Option<(i32, i32)> {
        self.geometry
    }

    fn on_screen(&self, p: Point) -> Point {
        match self.geometry {
            Some(g) => p.clamp_to(g),
            None => p,
        }
    }
}

impl InputDevice for Xdotool {
    fn click(&self, p: Point) -> Result<()> {
        xdotool_move_and_click(&self.display, self.on_screen(p), false)
    }

    fn move_to(&self, p: Point) -> Result<()> {
        xdotool_move(&self.display, self.on_screen(p))
    }

    fn type_text(&self, text: &str) -> Result<()> {
        type_text(&self.display, text, self.type_delay_ms)
    }

    fn key(&self, combo: &str) -> Result<()> {
        xdotool_key(&self.display, combo)
    }

    fn scroll(&self, clicks: i32) -> Result<()> {
        xdotool_scroll(&self.display, clicks)
    }

    fn position(&self) -> Result<Point> {
        get_mouse_location(&self.display)
    }
}

/// Pauses between dialog steps. Native dialogs animate and load lazily.
#[derive(Debug, Clone, Copy)]
pub struct DialogPauses {
    pub dialog_open: Duration,
    pub after_click: Duration,
    pub after_key: Duration,
    pub after_save: Duration,
}

impl Default for DialogPauses {
    fn default() -> Self {
        Self {
            dialog_open: Duration::from_secs(3),
            after_click: Duration::from_millis(1000),
            after_key: Duration::from_millis(200),
            after_save: Duration::from_millis(2000),
        }
    }
}

impl DialogPauses {
    #[cfg(test)]
    pub fn none() -> Self {
        Self {
            dialog_open: Duration::ZERO,
            after_click: Duration::ZERO,
            after_key: Duration::ZERO,
            after_save: Duration::ZERO,
        }
    }
}

/// Fixed click/type sequences against the print preview and save-as dialogs.
pub struct DialogRunner<'a, D: InputDevice> {
    device: &'a D,
    pauses: DialogPauses,
}

impl<'a, D: InputDevice> DialogRunner<'a, D> {
    pub fn new(device: &'a D, pauses: DialogPauses) -> Self {
        Self { device, pauses }
    }

    fn click(&self, what: &str, p: Point) -> Result<()> {
        info!(what, x = p.x, y = p.y, "click");
        self.device.click(p)?;
        sleep(self.pauses.after_click);
        Ok(())
    }

    /// Select everything in the focused field and delete it.
    pub fn clear_field(&self) -> Result<()> {
        self.device.key("ctrl+a")?;
        sleep(self.pauses.after_key);
        self.device.key("Delete")?;
        sleep(self.pauses.after_key);
        Ok(())
    }

    fn replace_text(&self, what: &str, at: Point, text: &str) -> Result<()> {
        self.click(what, at)?;
        self.clear_field()?;
        self.device.type_text(text)?;
        sleep(self.pauses.after_key);
        Ok(())
    }

    /// Chrome print preview -> OS save dialog -> PDF at `dir`/`file_name`.
    pub fn print_to_pdf(&self, coords: &PrintDialogCoordinates, dir: &str, file_name: &str) -> Result<()> {
        info!(dir, file_name, "driving print dialog");
        sleep(self.pauses.dialog_open);

        self.click("print button", coords.print_button)?;
        sleep(self.pauses.after_click);

        self.replace_text("folder field", coords.filepath_input, dir)?;
        self.device.key("Return")?;
        sleep(self.pauses.after_click);

        self.replace_text("file name field", coords.filename_input, file_name)?;
        self.click("save button", coords.save_button)?;

        if let Some(yes) = coords.yes_button.filter(Point::is_set) {
            self.click("overwrite confirmation", yes)?;
        }
        sleep(self.pauses.after_save);
        info!(file_name, "print dialog finished");
        Ok(())
    }

    /// Generic save-as flow started by clicking `coords.button`.
    pub fn save_file(&self, coords: &FileSaveCoordinates, dir: &str, file_name: &str) -> Result<()> {
        info!(dir, file_name, "driving save dialog");
        self.click("save trigger", coords.button)?;
        sleep(self.pauses.dialog_open);

        self.replace_text("folder field", coords.filepath_input, dir)?;
        self.device.key("Return")?;
        sleep(self.pauses.after_click);

        self.replace_text("file name field", coords.filename_input, file_name)?;
        self.click("save button", coords.save_button)?;
        sleep(self.pauses.after_save);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        events: RefCell<Vec<String>>,
    }

    impl InputDevice for Recorder {
        fn click(&self, p: Point) -> Result<()> {
            self.events.borrow_mut().push(format!("click {},{}", p.x, p.y));
            Ok(())
        }
        fn move_to(&self, p: Point) -> Result<()> {
            self.events.borrow_mut().push(format!("move {},{}", p.x, p.y));
            Ok(())
        }
        fn type_text(&self, text: &str) -> Result<()> {
            self.events.borrow_mut().push(format!("type {text}"));
            Ok(())
        }
        fn key(&self, combo: &str) -> Result<()> {
            self.events.borrow_mut().push(format!("key {combo}"));
            Ok(())
        }
        fn scroll(&self, clicks: i32) -> Result<()> {
            self.events.borrow_mut().push(format!("scroll {clicks}"));
            Ok(())
        }
        fn position(&self) -> Result<Point> {
            Ok(Point::new(1, 1))
        }
    }

    fn print_coords(yes: Option<Point>) -> PrintDialogCoordinates {
        PrintDialogCoordinates {
            print_button: Point::new(10, 10),
            filepath_input: Point::new(20, 20),
            filename_input: Point::new(30, 30),
            save_button: Point::new(40, 40),
            yes_button: yes,
        }
    }

    #[test]
    fn print_sequence_fills_folder_then_name() {
        let dev = Recorder::default();
        DialogRunner::new(&dev, DialogPauses::none())
            .print_to_pdf(&print_coords(Some(Point::new(50, 50))), "/tmp/pdf", "报销单_1.pdf")
            .unwrap();

        assert_eq!(
            dev.events.into_inner(),
            vec![
                "click 10,10",
                "click 20,20",
                "key ctrl+a",
                "key Delete",
                "type /tmp/pdf",
                "key Return",
                "click 30,30",
                "key ctrl+a",
                "key Delete",
                "type 报销单_1.pdf",
                "click 40,40",
                "click 50,50",
            ]
        );
    }

    #[test]
    fn unset_confirmation_button_is_not_clicked() {
        let dev = Recorder::default();
        DialogRunner::new(&dev, DialogPauses::none())
            .print_to_pdf(&print_coords(Some(Point::new(0, 0))), "/tmp", "a.pdf")
            .unwrap();
        let events = dev.events.into_inner();
        assert_eq!(events.last().map(String::as_str), Some("click 40,40"));
    }

    #[test]
    fn save_file_starts_from_trigger_button() {
        let dev = Recorder::default();
        let coords = FileSaveCoordinates {
            button: Point::new(1, 2),
            filepath_input: Point::new(3, 4),
            filename_input: Point::new(5, 6),
            save_button: Point::new(7, 8),
        };
        DialogRunner::new(&dev, DialogPauses::none())
            .save_file(&coords, "/out", "x.pdf")
            .unwrap();
        let events = dev.events.into_inner();
        assert_eq!(events.first().map(String::as_str), Some("click 1,2"));
        assert_eq!(events.last().map(String::as_str), Some("click 7,8"));
        assert!(events.contains(&"type x.pdf".to_string()));
    }
}
