//! Windows backend: GDI screen capture, SendInput mouse simulation, and
//! Tesseract-based text recognition.
//!
//! SendInput moves the real cursor; the game validates focus, so the window
//! is brought to the foreground before any input. PostMessage-style synthetic
//! messages do not work with the client's input layer.

use anyhow::{anyhow, Result};
use image::GrayImage;
use rand::Rng;
use std::ffi::OsString;
use std::os::windows::ffi::OsStringExt;
use std::path::PathBuf;
use std::process::Command;
use std::sync::Mutex;
use std::time::Duration;
use tempfile::NamedTempFile;

use windows::Win32::Foundation::{BOOL, HWND, LPARAM, RECT, TRUE};
use windows::Win32::Graphics::Gdi::{
    BitBlt, CreateCompatibleBitmap, CreateCompatibleDC, DeleteDC, DeleteObject, GetDC, GetDIBits,
    ReleaseDC, SelectObject, BITMAPINFO, BITMAPINFOHEADER, BI_RGB, DIB_RGB_COLORS, SRCCOPY,
};
use windows::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, INPUT, INPUT_0, INPUT_MOUSE, MOUSEEVENTF_ABSOLUTE, MOUSEEVENTF_LEFTDOWN,
    MOUSEEVENTF_LEFTUP, MOUSEEVENTF_MOVE, MOUSEINPUT, MOUSE_EVENT_FLAGS,
};
use windows::Win32::UI::WindowsAndMessaging::{
    EnumWindows, GetSystemMetrics, GetWindowRect, GetWindowTextLengthW, GetWindowTextW, IsIconic,
    IsWindowVisible, SetForegroundWindow, SM_CXSCREEN, SM_CYSCREEN,
};

use crate::geometry::{GameWindow, Point, Rect};
use crate::paths;
use crate::perception::{average_brightness, Screen};

/// Case-insensitive substring to match against window titles.
const WINDOW_TITLE_HINT: &str = "ragnarok";

pub struct NativeScreen {
    /// Raw handle from the last successful window resolution, kept so input
    /// can refocus the client without re-enumerating windows.
    hwnd: Mutex<isize>,
}

impl NativeScreen {
    pub fn new() -> Self {
        Self { hwnd: Mutex::new(0) }
    }

    fn bring_to_foreground(&self) {
        let raw = self.hwnd.lock().map(|h| *h).unwrap_or(0);
        if raw != 0 {
            unsafe {
                let _ = SetForegroundWindow(HWND(raw as *mut _));
            }
        }
    }
}

impl Default for NativeScreen {
    fn default() -> Self {
        Self::new()
    }
}

struct EnumData {
    hwnd: Option<HWND>,
    rect: RECT,
}

unsafe extern "system" fn enum_callback(hwnd: HWND, lparam: LPARAM) -> BOOL {
    unsafe {
        let data = &mut *(lparam.0 as *mut EnumData);

        if !IsWindowVisible(hwnd).as_bool() || IsIconic(hwnd).as_bool() {
            return TRUE;
        }

        let title_len = GetWindowTextLengthW(hwnd);
        if title_len == 0 {
            return TRUE;
        }
        let mut title_buf: Vec<u16> = vec![0; (title_len + 1) as usize];
        GetWindowTextW(hwnd, &mut title_buf);
        let title = OsString::from_wide(&title_buf[..title_len as usize])
            .to_string_lossy()
            .to_lowercase();
        if !title.contains(WINDOW_TITLE_HINT) {
            return TRUE;
        }

        let mut rect = RECT::default();
        if GetWindowRect(hwnd, &mut rect).is_err() {
            return TRUE;
        }

        data.hwnd = Some(hwnd);
        data.rect = rect;
        BOOL(0) // Stop enumeration
    }
}

impl Screen for NativeScreen {
    fn resolve_window(&self) -> Option<GameWindow> {
        let mut data = EnumData { hwnd: None, rect: RECT::default() };
        unsafe {
            // EnumWindows reports failure when the callback stops it early;
            // that is the found case, not an error.
            let _ = EnumWindows(Some(enum_callback), LPARAM(&mut data as *mut _ as isize));
        }
        let hwnd = data.hwnd?;
        if let Ok(mut cached) = self.hwnd.lock() {
            *cached = hwnd.0 as isize;
        }
        Some(GameWindow {
            x: data.rect.left,
            y: data.rect.top,
            w: data.rect.right - data.rect.left,
            h: data.rect.bottom - data.rect.top,
        })
    }

    fn capture_region(&self, region: Rect) -> Result<GrayImage> {
        if region.w <= 0 || region.h <= 0 {
            return Err(anyhow!("Empty capture region: {:?}", region));
        }
        let (w, h) = (region.w, region.h);

        unsafe {
            let screen_dc = GetDC(None);
            if screen_dc.is_invalid() {
                return Err(anyhow!("GetDC failed"));
            }
            let mem_dc = CreateCompatibleDC(screen_dc);
            let bitmap = CreateCompatibleBitmap(screen_dc, w, h);
            let previous = SelectObject(mem_dc, bitmap);

            let blit = BitBlt(mem_dc, 0, 0, w, h, screen_dc, region.x, region.y, SRCCOPY);

            let mut info = BITMAPINFO {
                bmiHeader: BITMAPINFOHEADER {
                    biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                    biWidth: w,
                    biHeight: -h, // top-down rows
                    biPlanes: 1,
                    biBitCount: 32,
                    biCompression: BI_RGB.0,
                    ..Default::default()
                },
                ..Default::default()
            };
            let mut pixels = vec![0u8; w as usize * h as usize * 4];
            let lines = GetDIBits(
                mem_dc,
                bitmap,
                0,
                h as u32,
                Some(pixels.as_mut_ptr() as *mut _),
                &mut info,
                DIB_RGB_COLORS,
            );

            SelectObject(mem_dc, previous);
            let _ = DeleteObject(bitmap);
            let _ = DeleteDC(mem_dc);
            ReleaseDC(None, screen_dc);

            blit.map_err(|e| anyhow!("BitBlt failed: {}", e))?;
            if lines == 0 {
                return Err(anyhow!("GetDIBits failed"));
            }

            let mut gray = GrayImage::new(w as u32, h as u32);
            for (i, px) in gray.pixels_mut().enumerate() {
                let offset = i * 4;
                // BGRA order from GDI
                let b = pixels[offset] as f32;
                let g = pixels[offset + 1] as f32;
                let r = pixels[offset + 2] as f32;
                *px = image::Luma([(0.299 * r + 0.587 * g + 0.114 * b) as u8]);
            }
            Ok(gray)
        }
    }

    fn average_brightness(&self, region: Rect) -> Result<f32> {
        let img = self.capture_region(region)?;
        Ok(average_brightness(&img))
    }

    fn recognize_text(&self, region: Rect) -> Result<String> {
        // Best effort by contract: any failure along the way reads as "no
        // text here", which callers already handle.
        let Ok(img) = self.capture_region(region) else {
            return Ok(String::new());
        };
        let Ok(temp_input) = NamedTempFile::with_suffix(".png") else {
            return Ok(String::new());
        };
        if img.save(temp_input.path()).is_err() {
            return Ok(String::new());
        }

        let output = Command::new(tesseract_command())
            .arg(temp_input.path())
            .arg("stdout")
            .arg("-l")
            .arg("eng")
            .arg("--psm")
            .arg("6")
            .output();

        match output {
            Ok(out) if out.status.success() => Ok(String::from_utf8_lossy(&out.stdout).to_string()),
            _ => Ok(String::new()),
        }
    }

    fn click(&self, point: Point, jitter: i32) {
        self.bring_to_foreground();

        let mut rng = rand::thread_rng();
        let (x, y) = if jitter > 0 {
            (
                point.x + rng.gen_range(-jitter..=jitter),
                point.y + rng.gen_range(-jitter..=jitter),
            )
        } else {
            (point.x, point.y)
        };

        send_mouse(x, y, MOUSEEVENTF_MOVE | MOUSEEVENTF_ABSOLUTE);
        sleep_ms(rng.gen_range(50..=130));
        send_mouse(x, y, MOUSEEVENTF_LEFTDOWN | MOUSEEVENTF_ABSOLUTE | MOUSEEVENTF_MOVE);
        sleep_ms(rng.gen_range(40..=100));
        send_mouse(x, y, MOUSEEVENTF_LEFTUP | MOUSEEVENTF_ABSOLUTE | MOUSEEVENTF_MOVE);
        sleep_ms(rng.gen_range(30..=80));
    }

    fn drag_vertical(&self, from: Point, dy: i32) {
        self.bring_to_foreground();

        let mut rng = rand::thread_rng();
        let x = from.x + rng.gen_range(-4..=4);
        let y = from.y + rng.gen_range(-4..=4);

        send_mouse(x, y, MOUSEEVENTF_MOVE | MOUSEEVENTF_ABSOLUTE);
        sleep_ms(rng.gen_range(60..=120));
        send_mouse(x, y, MOUSEEVENTF_LEFTDOWN | MOUSEEVENTF_ABSOLUTE | MOUSEEVENTF_MOVE);
        sleep_ms(80);

        // Stepped movement so the list tracks the drag instead of treating
        // it as a flick.
        const STEPS: i32 = 10;
        for step in 1..=STEPS {
            send_mouse(x, y + dy * step / STEPS, MOUSEEVENTF_MOVE | MOUSEEVENTF_ABSOLUTE);
            sleep_ms(50);
        }

        send_mouse(x, y + dy, MOUSEEVENTF_LEFTUP | MOUSEEVENTF_ABSOLUTE | MOUSEEVENTF_MOVE);
        sleep_ms(200);
    }
}

/// Prefers a tesseract bundled next to the executable, falls back to PATH.
fn tesseract_command() -> PathBuf {
    let bundled = paths::get_exe_dir().join("tesseract").join("tesseract.exe");
    if bundled.exists() {
        bundled
    } else {
        PathBuf::from("tesseract")
    }
}

/// One absolute-positioned mouse event, normalized to the 0-65535 range
/// MOUSEEVENTF_ABSOLUTE requires.
fn send_mouse(x: i32, y: i32, flags: MOUSE_EVENT_FLAGS) {
    unsafe {
        let screen_w = GetSystemMetrics(SM_CXSCREEN).max(1);
        let screen_h = GetSystemMetrics(SM_CYSCREEN).max(1);
        let norm_x = ((x as i64 * 65535) / screen_w as i64) as i32;
        let norm_y = ((y as i64 * 65535) / screen_h as i64) as i32;

        let input = INPUT {
            r#type: INPUT_MOUSE,
            Anonymous: INPUT_0 {
                mi: MOUSEINPUT {
                    dx: norm_x,
                    dy: norm_y,
                    dwFlags: flags,
                    ..Default::default()
                },
            },
        };
        SendInput(&[input], std::mem::size_of::<INPUT>() as i32);
    }
}

fn sleep_ms(ms: u64) {
    std::thread::sleep(Duration::from_millis(ms));
}
