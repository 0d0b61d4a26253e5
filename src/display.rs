//! In-place console status display.
//!
//! Every frame is redrawn over the previous one, so the console does not scroll.
//! This only holds as long as each frame writes exactly as many lines as its
//! [Layout] declares, and the next frame erases that many lines.

use std::io::{Error, Write};

use crossterm::{
    cursor::{MoveDown, MoveUp},
    queue,
    terminal::{Clear, ClearType},
};

use crate::{geo::distance_calculate, pvt::FixSample, settings::ReferencePoint, utils};

/// Frame layout
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Layout {
    /// Receiver is still looking for a fix
    Searching,

    /// Receiver has a valid fix
    Fixed,
}

impl Layout {
    /// Number of console lines occupied by this [Layout]
    pub const fn lines(&self) -> u16 {
        match self {
            Self::Searching => 4,
            Self::Fixed => 20,
        }
    }
}

/// Console renderer. Only remembers the [Layout] of the previous frame.
#[derive(Debug, Default)]
pub struct Display {
    previous: Option<Layout>,
}

impl Display {
    /// [Layout] of the previously drawn frame, None before the first frame
    #[cfg(test)]
    pub fn previous(&self) -> Option<Layout> {
        self.previous
    }

    /// Erases the previous frame (if any) and starts a new [Frame]
    pub fn begin<'a, W: Write>(
        &mut self,
        w: &'a mut W,
        layout: Layout,
    ) -> std::io::Result<Frame<'a, W>> {
        if let Some(previous) = self.previous {
            erase(w, previous.lines())?;
        }

        self.previous = Some(layout);

        Ok(Frame {
            w,
            layout,
            lines: 0,
        })
    }
}

/// Moves up `lines` lines, clears them one by one, then returns to the top.
fn erase<W: Write>(w: &mut W, lines: u16) -> std::io::Result<()> {
    queue!(w, MoveUp(lines))?;

    for i in 0..lines {
        queue!(w, Clear(ClearType::CurrentLine))?;
        if i < lines - 1 {
            queue!(w, MoveDown(1))?;
        }
    }

    queue!(w, MoveUp(lines - 1))
}

/// One frame being drawn. Counts the lines going through it.
pub struct Frame<'a, W: Write> {
    w: &'a mut W,
    layout: Layout,
    lines: u16,
}

impl<W: Write> Write for Frame<'_, W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let size = self.w.write(buf)?;
        self.lines += buf[..size].iter().filter(|b| **b == b'\n').count() as u16;
        Ok(size)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.w.flush()
    }
}

impl<W: Write> Frame<'_, W> {
    /// Pads the frame to its [Layout] height, then flushes.
    pub fn finish(mut self) -> std::io::Result<()> {
        let height = self.layout.lines();

        if self.lines > height {
            return Err(Error::other(format!(
                "{:?} frame overflow: {} lines written",
                self.layout, self.lines
            )));
        }

        while self.lines < height {
            writeln!(self)?;
        }

        self.flush()
    }
}

pub fn print_satellite_stats<W: Write>(w: &mut W, pvt: &FixSample) -> std::io::Result<()> {
    writeln!(w, "{}", pvt.satellite_stats())
}

pub fn print_flags<W: Write>(w: &mut W, pvt: &FixSample) -> std::io::Result<()> {
    writeln!(w, "Status: {}", utils::pvt_flags_to_string(pvt.flags))
}

pub fn print_fix_data<W: Write>(w: &mut W, pvt: &FixSample) -> std::io::Result<()> {
    writeln!(w, "Latitude:          {:.6}", pvt.latitude)?;
    writeln!(w, "Longitude:         {:.6}", pvt.longitude)?;
    writeln!(w, "Accuracy:          {:.1} m", pvt.accuracy)?;
    writeln!(w, "Altitude:          {:.1} m", pvt.altitude)?;
    writeln!(w, "Altitude accuracy: {:.1} m", pvt.altitude_accuracy)?;
    writeln!(w, "Speed:             {:.1} m/s", pvt.speed)?;
    writeln!(w, "Speed accuracy:    {:.1} m/s", pvt.speed_accuracy)?;
    writeln!(w, "V. speed:          {:.1} m/s", pvt.vertical_speed)?;
    writeln!(w, "V. speed accuracy: {:.1} m/s", pvt.vertical_speed_accuracy)?;
    writeln!(w, "Heading:           {:.1} deg", pvt.heading)?;
    writeln!(w, "Heading accuracy:  {:.1} deg", pvt.heading_accuracy)?;

    let dt = &pvt.datetime;

    writeln!(w, "Date:              {:04}-{:02}-{:02}", dt.year, dt.month, dt.day)?;
    writeln!(
        w,
        "Time (UTC):        {:02}:{:02}:{:02}.{:03}",
        dt.hour, dt.minute, dt.seconds, dt.ms
    )?;

    writeln!(w, "PDOP:              {:.1}", pvt.pdop)?;
    writeln!(w, "HDOP:              {:.1}", pvt.hdop)?;
    writeln!(w, "VDOP:              {:.1}", pvt.vdop)?;
    writeln!(w, "TDOP:              {:.1}", pvt.tdop)
}

/// Prints distance to the [ReferencePoint]. Does nothing when no reference is set.
pub fn print_distance_from_reference<W: Write>(
    w: &mut W,
    reference: Option<&ReferencePoint>,
    pvt: &FixSample,
) -> std::io::Result<()> {
    let Some(reference) = reference else {
        return Ok(());
    };

    let distance = distance_calculate(
        pvt.latitude,
        pvt.longitude,
        reference.latitude,
        reference.longitude,
    );

    writeln!(w, "Distance from reference: {:.1} m", distance)
}

pub fn print_search_status<W: Write>(
    w: &mut W,
    seconds_since_fix: u64,
    indicator: char,
) -> std::io::Result<()> {
    writeln!(w, "Seconds since last fix: {}", seconds_since_fix)?;
    writeln!(w, "Searching [{}]", indicator)
}
