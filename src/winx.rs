// winlayout — Save & Restore Windows Desktop Layouts
// Copyright (C) 2026  Martin Gehrken (IamLumae)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Thin safe wrappers over the Win32 windowing and process APIs.
//!
//! Handles can die between any two calls (window closed, process elevated),
//! so every wrapper degrades to an empty/default result or a `Result` the
//! caller treats as a per-window failure. Nothing here panics.

use std::ffi::c_void;
use std::mem;

use windows::core::{Result as WinResult, PWSTR};
use windows::Wdk::System::Threading::{
    NtQueryInformationProcess, ProcessBasicInformation, PROCESS_BASIC_INFORMATION,
};
use windows::Win32::Foundation::{
    CloseHandle, BOOL, FALSE, HANDLE, HWND, LPARAM, RECT, TRUE, WPARAM,
};
use windows::Win32::Graphics::Gdi::{
    EnumDisplayMonitors, GetMonitorInfoW, HDC, HMONITOR, MONITORINFO, MONITORINFOF_PRIMARY,
};
use windows::Win32::System::Diagnostics::Debug::ReadProcessMemory;
use windows::Win32::System::Threading::{
    OpenProcess, QueryFullProcessImageNameW, PEB, PROCESS_NAME_FORMAT,
    PROCESS_QUERY_INFORMATION, PROCESS_QUERY_LIMITED_INFORMATION, PROCESS_VM_READ,
    RTL_USER_PROCESS_PARAMETERS,
};
use windows::Win32::UI::WindowsAndMessaging::{
    EnumWindows, GetParent, GetWindow, GetWindowLongW, GetWindowPlacement,
    GetWindowRect, GetWindowTextW, GetWindowThreadProcessId, GetClassNameW, IsIconic, IsWindow,
    IsWindowVisible, MoveWindow, PostMessageW, SetForegroundWindow, SetWindowPlacement,
    SetWindowPos, ShowWindow, GWL_EXSTYLE, GW_OWNER, HWND_TOP, SHOW_WINDOW_CMD,
    SWP_NOACTIVATE, SWP_NOMOVE, SWP_NOSIZE, SW_RESTORE, SW_SHOWMAXIMIZED, SW_SHOWMINIMIZED,
    SW_SHOWNOACTIVATE, SW_SHOWNORMAL, WINDOWPLACEMENT, WM_CLOSE, WS_EX_APPWINDOW,
    WS_EX_TOOLWINDOW,
};

use crate::model::{Rect, ShowState, WindowHandle};
use crate::placement::MonitorBounds;

fn hwnd(handle: WindowHandle) -> HWND {
    HWND(handle.0 as *mut _)
}

fn to_rect(rc: RECT) -> Rect {
    Rect::new(rc.left, rc.top, rc.right, rc.bottom)
}

fn sw_cmd(state: ShowState) -> SHOW_WINDOW_CMD {
    match state {
        ShowState::Normal => SW_SHOWNORMAL,
        ShowState::Minimized => SW_SHOWMINIMIZED,
        ShowState::Maximized => SW_SHOWMAXIMIZED,
    }
}

// ── Enumeration ─────────────────────────────────────

unsafe extern "system" fn enum_windows_cb(win: HWND, lparam: LPARAM) -> BOOL {
    let vec = &mut *(lparam.0 as *mut Vec<WindowHandle>);
    vec.push(WindowHandle(win.0 as isize));
    TRUE
}

/// All top-level windows, front-to-back.
///
/// EnumWindows enumerates in Z order from the front, which makes the
/// result both the candidate list and the Z-order source of truth.
pub fn enumerate_top_level() -> Vec<WindowHandle> {
    let mut handles: Vec<WindowHandle> = Vec::new();
    unsafe {
        let _ = EnumWindows(
            Some(enum_windows_cb),
            LPARAM(&mut handles as *mut Vec<WindowHandle> as isize),
        );
    }
    handles
}

// ── Per-window queries ──────────────────────────────

pub fn is_window(handle: WindowHandle) -> bool {
    unsafe { IsWindow(hwnd(handle)).as_bool() }
}

pub fn is_visible(handle: WindowHandle) -> bool {
    unsafe { IsWindowVisible(hwnd(handle)).as_bool() }
}

pub fn is_minimized(handle: WindowHandle) -> bool {
    unsafe { IsIconic(hwnd(handle)).as_bool() }
}

pub fn has_parent(handle: WindowHandle) -> bool {
    unsafe { GetParent(hwnd(handle)).map(|h| !h.is_invalid()).unwrap_or(false) }
}

pub fn has_owner(handle: WindowHandle) -> bool {
    unsafe {
        GetWindow(hwnd(handle), GW_OWNER)
            .map(|h| !h.is_invalid())
            .unwrap_or(false)
    }
}

pub fn is_tool_window(handle: WindowHandle) -> bool {
    let ex = unsafe { GetWindowLongW(hwnd(handle), GWL_EXSTYLE) } as u32;
    ex & WS_EX_TOOLWINDOW.0 != 0
}

pub fn is_app_window(handle: WindowHandle) -> bool {
    let ex = unsafe { GetWindowLongW(hwnd(handle), GWL_EXSTYLE) } as u32;
    ex & WS_EX_APPWINDOW.0 != 0
}

pub fn window_title(handle: WindowHandle) -> String {
    let mut buf = [0u16; 512];
    let len = unsafe { GetWindowTextW(hwnd(handle), &mut buf) };
    if len <= 0 {
        return String::new();
    }
    String::from_utf16_lossy(&buf[..len as usize])
}

pub fn window_class(handle: WindowHandle) -> String {
    let mut buf = [0u16; 256];
    let len = unsafe { GetClassNameW(hwnd(handle), &mut buf) };
    if len <= 0 {
        return String::new();
    }
    String::from_utf16_lossy(&buf[..len as usize])
}

pub fn window_pid(handle: WindowHandle) -> u32 {
    let mut pid: u32 = 0;
    unsafe {
        GetWindowThreadProcessId(hwnd(handle), Some(&mut pid));
    }
    pid
}

pub fn window_rect(handle: WindowHandle) -> Rect {
    let mut rc = RECT::default();
    unsafe {
        let _ = GetWindowRect(hwnd(handle), &mut rc);
    }
    to_rect(rc)
}

/// (show state, OS-remembered normal rect).
pub fn placement(handle: WindowHandle) -> (ShowState, Rect) {
    let mut wp = WINDOWPLACEMENT {
        length: mem::size_of::<WINDOWPLACEMENT>() as u32,
        ..Default::default()
    };
    let ok = unsafe { GetWindowPlacement(hwnd(handle), &mut wp) };
    if ok.is_err() {
        return (ShowState::Normal, Rect::default());
    }
    let state = if wp.showCmd == SW_SHOWMINIMIZED.0 as u32 {
        ShowState::Minimized
    } else if wp.showCmd == SW_SHOWMAXIMIZED.0 as u32 {
        ShowState::Maximized
    } else {
        ShowState::Normal
    };
    (state, to_rect(wp.rcNormalPosition))
}

// ── Placement / movement ────────────────────────────

/// Atomic normal-position + show-state write. Windows restores max/min
/// windows from the normal position, so both travel in one call.
pub fn set_placement(handle: WindowHandle, state: ShowState, normal: Rect) -> WinResult<()> {
    unsafe {
        let mut wp = WINDOWPLACEMENT {
            length: mem::size_of::<WINDOWPLACEMENT>() as u32,
            ..Default::default()
        };
        // Keep current flags and min/max anchor points.
        let _ = GetWindowPlacement(hwnd(handle), &mut wp);
        wp.length = mem::size_of::<WINDOWPLACEMENT>() as u32;
        wp.showCmd = sw_cmd(state).0 as u32;
        wp.rcNormalPosition = RECT {
            left: normal.left(),
            top: normal.top(),
            right: normal.right(),
            bottom: normal.bottom(),
        };
        SetWindowPlacement(hwnd(handle), &wp)
    }
}

pub fn move_window(handle: WindowHandle, rect: Rect) -> WinResult<()> {
    unsafe {
        MoveWindow(
            hwnd(handle),
            rect.left(),
            rect.top(),
            rect.width(),
            rect.height(),
            TRUE,
        )
    }
}

pub fn show(handle: WindowHandle, state: ShowState) {
    unsafe {
        let _ = ShowWindow(hwnd(handle), sw_cmd(state));
    }
}

pub fn show_no_activate(handle: WindowHandle) {
    unsafe {
        let _ = ShowWindow(hwnd(handle), SW_SHOWNOACTIVATE);
    }
}

pub fn show_restore(handle: WindowHandle) {
    unsafe {
        let _ = ShowWindow(hwnd(handle), SW_RESTORE);
    }
}

/// Bring to the top of the stack without moving, resizing, or stealing
/// focus.
pub fn bring_to_top(handle: WindowHandle) -> WinResult<()> {
    unsafe {
        SetWindowPos(
            hwnd(handle),
            HWND_TOP,
            0,
            0,
            0,
            0,
            SWP_NOMOVE | SWP_NOSIZE | SWP_NOACTIVATE,
        )
    }
}

pub fn set_foreground(handle: WindowHandle) -> bool {
    unsafe { SetForegroundWindow(hwnd(handle)).as_bool() }
}

/// Ask the window to close; the app may refuse or prompt.
pub fn post_close(handle: WindowHandle) -> WinResult<()> {
    unsafe { PostMessageW(hwnd(handle), WM_CLOSE, WPARAM(0), LPARAM(0)) }
}

// ── Process introspection ───────────────────────────

/// (process name, full exe path) for a pid; empty strings when the
/// process is gone or elevated beyond our query rights.
pub fn process_image(pid: u32) -> (String, String) {
    if pid == 0 {
        return (String::new(), String::new());
    }
    unsafe {
        let handle = match OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, FALSE, pid) {
            Ok(h) => h,
            Err(_) => return (String::new(), String::new()),
        };
        let mut buf = [0u16; 1024];
        let mut len = buf.len() as u32;
        let ok = QueryFullProcessImageNameW(
            handle,
            PROCESS_NAME_FORMAT(0),
            PWSTR(buf.as_mut_ptr()),
            &mut len,
        );
        let _ = CloseHandle(handle);
        if ok.is_err() {
            return (String::new(), String::new());
        }
        let path = String::from_utf16_lossy(&buf[..len as usize]);
        let name = path.rsplit('\\').next().unwrap_or("").to_string();
        (name, path)
    }
}

unsafe fn read_remote<T>(process: HANDLE, addr: *const c_void, out: &mut T) -> bool {
    if addr.is_null() {
        return false;
    }
    ReadProcessMemory(
        process,
        addr,
        out as *mut T as *mut c_void,
        mem::size_of::<T>(),
        None,
    )
    .is_ok()
}

/// Read a process's command line out of its PEB.
///
/// Needs PROCESS_VM_READ, which an elevated process denies us — that is a
/// normal outcome, the caller falls back to default profile settings.
pub fn process_command_line(pid: u32) -> Option<String> {
    if pid == 0 {
        return None;
    }
    unsafe {
        let process =
            OpenProcess(PROCESS_QUERY_INFORMATION | PROCESS_VM_READ, FALSE, pid).ok()?;
        let cmdline = read_peb_command_line(process);
        let _ = CloseHandle(process);
        cmdline
    }
}

unsafe fn read_peb_command_line(process: HANDLE) -> Option<String> {
    let mut pbi: PROCESS_BASIC_INFORMATION = mem::zeroed();
    let mut out_len = 0u32;
    let status = NtQueryInformationProcess(
        process,
        ProcessBasicInformation,
        &mut pbi as *mut _ as *mut c_void,
        mem::size_of::<PROCESS_BASIC_INFORMATION>() as u32,
        &mut out_len,
    );
    if status.is_err() {
        return None;
    }

    let mut peb: PEB = mem::zeroed();
    if !read_remote(process, pbi.PebBaseAddress as *const c_void, &mut peb) {
        return None;
    }
    let mut params: RTL_USER_PROCESS_PARAMETERS = mem::zeroed();
    if !read_remote(process, peb.ProcessParameters as *const c_void, &mut params) {
        return None;
    }

    let unicode = params.CommandLine;
    let byte_len = unicode.Length as usize;
    if byte_len == 0 || unicode.Buffer.is_null() {
        return None;
    }
    let mut buf = vec![0u16; byte_len / 2];
    let ok = ReadProcessMemory(
        process,
        unicode.Buffer.0 as *const c_void,
        buf.as_mut_ptr() as *mut c_void,
        byte_len,
        None,
    )
    .is_ok();
    if !ok {
        return None;
    }
    Some(String::from_utf16_lossy(&buf))
}

// ── Monitors ────────────────────────────────────────

unsafe extern "system" fn enum_monitor_cb(
    monitor: HMONITOR,
    _hdc: HDC,
    _rect: *mut RECT,
    lparam: LPARAM,
) -> BOOL {
    let vec = &mut *(lparam.0 as *mut Vec<MonitorBounds>);
    let mut info = MONITORINFO {
        cbSize: mem::size_of::<MONITORINFO>() as u32,
        ..Default::default()
    };
    if GetMonitorInfoW(monitor, &mut info).as_bool() {
        let bounds = MonitorBounds {
            monitor: to_rect(info.rcMonitor),
            work: to_rect(info.rcWork),
        };
        // Keep the primary monitor first; clamping targets it.
        if info.dwFlags & MONITORINFOF_PRIMARY != 0 {
            vec.insert(0, bounds);
        } else {
            vec.push(bounds);
        }
    }
    TRUE
}

/// All display monitors, primary first.
pub fn monitors() -> Vec<MonitorBounds> {
    let mut out: Vec<MonitorBounds> = Vec::new();
    unsafe {
        let _ = EnumDisplayMonitors(
            None,
            None,
            Some(enum_monitor_cb),
            LPARAM(&mut out as *mut Vec<MonitorBounds> as isize),
        );
    }
    out
}
