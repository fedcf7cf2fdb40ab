//! Zero Dawn rendering (read-only from the engine).

use std::cell::RefCell;
use std::rc::Rc;

use ratzilla::ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratzilla::ratatui::style::{Color, Modifier, Style};
use ratzilla::ratatui::text::{Line, Span};
use ratzilla::ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratzilla::ratatui::Frame;

use crate::input::{is_narrow_layout, ClickState};
use crate::time::now_ms;
use crate::widgets::{ClickableList, TabBar};

use super::actions::*;
use super::machines::{cauldron_cost, unlocks, Role};
use super::state::{MachineType, Task};
use super::upgrades::MAX_LAND;
use super::ZeroDawnGame;

const TASK_KEYS: [(&str, &str); 2] = [("a", "A"), ("s", "S")];

fn key_span(key: &str) -> Span<'static> {
    Span::styled(
        format!(" [{}] ", key),
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    )
}

fn enabled_style(enabled: bool) -> Style {
    if enabled {
        Style::default().fg(Color::White)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

fn dim(text: impl Into<String>) -> Line<'static> {
    Line::from(Span::styled(text.into(), Style::default().fg(Color::DarkGray)))
}

fn inner_width(area: Rect, borders: Borders) -> u16 {
    match borders {
        Borders::ALL => area.width.saturating_sub(2),
        _ => area.width,
    }
}

pub fn render(
    game: &ZeroDawnGame,
    f: &mut Frame,
    area: Rect,
    click_state: &Rc<RefCell<ClickState>>,
) {
    let is_narrow = is_narrow_layout(area.width);
    let borders = if is_narrow {
        Borders::TOP | Borders::BOTTOM
    } else {
        Borders::ALL
    };

    if game.engine.state().tutorial_open {
        render_intro(f, area, borders, click_state);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6), // Reserves + last tick
            Constraint::Length(3), // Machine type tabs
            Constraint::Min(21),   // Machines + detail/upgrades + cauldron
            Constraint::Length(7), // Log
        ])
        .split(area);

    render_header(game, f, chunks[0], borders, click_state);
    render_tabs(game, f, chunks[1], borders, click_state);

    let (list_area, side_area) = if is_narrow {
        let body = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(8), Constraint::Min(21)])
            .split(chunks[2]);
        (body[0], body[1])
    } else {
        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(chunks[2]);
        (body[0], body[1])
    };
    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(8), Constraint::Length(13)])
        .split(side_area);

    render_machine_list(game, f, list_area, borders, click_state);
    if game.view.show_upgrades {
        render_upgrades(game, f, side[0], borders, click_state);
    } else {
        render_detail(game, f, side[0], borders, click_state);
    }
    render_cauldron(game, f, side[1], borders, click_state);
    render_log(game, f, chunks[3], borders);
}

fn render_intro(f: &mut Frame, area: Rect, borders: Borders, click_state: &Rc<RefCell<ClickState>>) {
    let mut cl = ClickableList::new();
    cl.push(Line::from(""));
    cl.push(Line::from(Span::styled(
        " The Earth is dead. Project Zero Dawn is not.",
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )));
    cl.push(Line::from(""));
    cl.push(Line::from(
        " Build machines in your Cauldron and set them to work. Acquisition machines \
         terraform land and harvest it for power and materials. Recon machines find \
         richer ground. Transports carry materials from the main reserve to your \
         Cauldrons, where new machines are made.",
    ));
    cl.push(Line::from(""));
    cl.push(dim(
        " Time stands still while this panel is open. Restore all 148,940,000 km² to wake humanity.",
    ));
    cl.push(Line::from(""));
    cl.push_clickable(
        Line::from(vec![
            key_span("s"),
            Span::styled(
                "Begin",
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            ),
        ]),
        START,
    );

    let width = inner_width(area, borders);
    let block = Block::default()
        .borders(borders)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Zero Dawn ");
    {
        let mut cs = click_state.borrow_mut();
        cl.register_targets(area, &mut cs, 1, 1, width);
    }
    let widget = Paragraph::new(cl.into_lines())
        .block(block)
        .wrap(Wrap { trim: false });
    f.render_widget(widget, area);
}

fn render_header(
    game: &ZeroDawnGame,
    f: &mut Frame,
    area: Rect,
    borders: Borders,
    click_state: &Rc<RefCell<ClickState>>,
) {
    let engine = &game.engine;
    let s = engine.state();
    let mut cl = ClickableList::new();
    cl.push(Line::from(vec![
        Span::styled(" Power ", Style::default().fg(Color::Gray)),
        Span::styled(
            format!("{:.2}", s.power),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled("  Materials ", Style::default().fg(Color::Gray)),
        Span::styled(
            format!("{:.2}", s.materials),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("  (total {:.2})", s.total_available_materials),
            Style::default().fg(Color::DarkGray),
        ),
    ]));

    let mut land = vec![
        Span::styled(" Land ", Style::default().fg(Color::Gray)),
        Span::styled(
            format!(
                "{:.2} km² ({:.4}%)",
                s.land_restored,
                s.land_restored / MAX_LAND * 100.0
            ),
            Style::default().fg(Color::Green),
        ),
    ];
    if s.humans > 0 {
        land.push(Span::styled(
            format!("  Humans {} in {} villages", s.humans, s.villages.len()),
            Style::default().fg(Color::Magenta),
        ));
    }
    cl.push(Line::from(land));

    let t = &s.last_tick;
    let mut tick = format!(
        " Last tick: +{:.2} power, -{:.2} used, +{:.2} materials, {:.2} km² restored, {:.3} km² harvested",
        t.energy, t.power_spent, t.materials, t.restored, t.land_used
    );
    if let Some(buff) = t.buff {
        tick.push_str(&format!(", {} buff", engine.machines().get(buff).name));
    }
    cl.push(dim(tick));

    let reset_label = if game.view.confirm_reset {
        Span::styled(
            "Press again to start over",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled("Reset", Style::default().fg(Color::DarkGray))
    };
    cl.push_clickable(Line::from(vec![key_span("R"), reset_label]), RESET_GAME);

    let block = Block::default()
        .borders(borders)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Span::styled(
            " Zero Dawn ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ));
    {
        let mut cs = click_state.borrow_mut();
        cl.register_targets(area, &mut cs, 1, 1, 0);
    }
    f.render_widget(Paragraph::new(cl.into_lines()).block(block), area);
}

fn render_tabs(
    game: &ZeroDawnGame,
    f: &mut Frame,
    area: Rect,
    borders: Borders,
    click_state: &Rc<RefCell<ClickState>>,
) {
    let mut bar = TabBar::new(" │ ");
    for (i, ty) in MachineType::ALL.into_iter().enumerate() {
        let style = if ty == game.view.machine_type {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Green)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        bar = bar.tab(format!("{} {}", i + 1, ty.label()), style, TAB_TYPE_BASE + i as u16);
    }
    let block = Block::default()
        .borders(borders)
        .border_style(Style::default().fg(Color::DarkGray));
    let mut cs = click_state.borrow_mut();
    bar.block(block).render(f, area, &mut cs);
}

fn render_machine_list(
    game: &ZeroDawnGame,
    f: &mut Frame,
    area: Rect,
    borders: Borders,
    click_state: &Rc<RefCell<ClickState>>,
) {
    let engine = &game.engine;
    let s = engine.state();
    let selected = game.selected_machine();
    let mut cl = ClickableList::new();

    cl.push_clickable(
        Line::from(vec![
            key_span("?"),
            Span::styled("Intro", Style::default().fg(Color::DarkGray)),
        ]),
        OPEN_TUTORIAL,
    );
    cl.push(dim(" j/k or tap to select"));
    for (i, id) in engine
        .purchasable_machines(game.view.machine_type)
        .into_iter()
        .enumerate()
    {
        let is_selected = selected == Some(id);
        let marker = if is_selected { " ▶ " } else { "   " };
        let style = if is_selected {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else {
            enabled_style(s.count(id) > 0)
        };
        let busy = s.busy(id).len();
        cl.push_clickable(
            Line::from(vec![
                Span::styled(marker, style),
                Span::styled(engine.machines().get(id).name, style),
                Span::styled(
                    format!("  x{} ({busy} busy)", s.count(id)),
                    Style::default().fg(Color::DarkGray),
                ),
            ]),
            SELECT_MACHINE_BASE + i as u16,
        );
    }

    let block = Block::default()
        .borders(borders)
        .border_style(Style::default().fg(Color::Green))
        .title(format!(" {} machines ", game.view.machine_type.label()));
    {
        let mut cs = click_state.borrow_mut();
        cl.register_targets(area, &mut cs, 1, 1, 0);
    }
    f.render_widget(Paragraph::new(cl.into_lines()).block(block), area);
}

fn role_line(role: &Role) -> String {
    match *role {
        Role::Acquisition {
            output_power,
            output_materials,
            restore_rate,
        } => format!(
            " Yields {output_power:.2} power, {output_materials:.2} materials; restores {restore_rate:.2} km²"
        ),
        Role::Recon {
            location_chance,
            buff_duration,
            buff_multiplier,
            buff_range,
        } => format!(
            " {:.0}% find chance; x{buff_multiplier:.2} for {buff_duration:.0}s or {buff_range} runs",
            location_chance * 100.0
        ),
        Role::Transport {
            carrying_capacity,
            transport_speed,
        } => format!(" Carries {carrying_capacity:.0} materials, {transport_speed:.0}s per trip"),
        Role::Combat {
            attack_power,
            combat_power_consumption,
        } => format!(" Attack {attack_power:.1}, {combat_power_consumption:.1} power in combat"),
    }
}

fn render_detail(
    game: &ZeroDawnGame,
    f: &mut Frame,
    area: Rect,
    borders: Borders,
    click_state: &Rc<RefCell<ClickState>>,
) {
    let engine = &game.engine;
    let s = engine.state();
    let mut cl = ClickableList::new();

    cl.push_clickable(
        Line::from(vec![
            key_span("u"),
            Span::styled("Show upgrades", Style::default().fg(Color::Magenta)),
        ]),
        TOGGLE_UPGRADES,
    );

    match game.selected_machine() {
        None => cl.push(Line::from(" No designs unlocked for this type yet.")),
        Some(id) => {
            let stats = engine.machines().get(id);
            let building: usize = s
                .cauldrons
                .iter()
                .map(|c| c.busy.iter().filter(|(m, _)| *m == id).count())
                .sum();
            let mut title = vec![Span::styled(
                format!(" {} x{}  idle {}", stats.name, s.count(id), s.idle(id)),
                Style::default().add_modifier(Modifier::BOLD),
            )];
            if building > 0 {
                title.push(Span::styled(
                    format!("  (+{building} building)"),
                    Style::default().fg(Color::Green),
                ));
            }
            cl.push(Line::from(title));
            cl.push(dim(format!(
                " Cost {:.0} power / {:.0} materials, {:.1}s  Upkeep {:.2}  Defense {:.0}",
                stats.cost.energy,
                stats.cost.materials,
                stats.creation_time,
                stats.power_consumption,
                stats.defense
            )));
            cl.push(dim(role_line(&stats.role)));

            cl.push_clickable(
                Line::from(vec![
                    key_span("b"),
                    Span::styled("Build 1", enabled_style(engine.can_purchase(id, 1))),
                ]),
                BUILD_ONE,
            );
            cl.push_clickable(
                Line::from(vec![
                    key_span("B"),
                    Span::styled("Build 10", enabled_style(engine.can_purchase(id, 10))),
                ]),
                BUILD_TEN,
            );
            cl.push_clickable(
                Line::from(vec![
                    key_span("x"),
                    Span::styled("Break down", enabled_style(engine.can_break_down(id))),
                ]),
                BREAK_DOWN,
            );

            for (slot, task) in game.view.machine_type.tasks().iter().enumerate() {
                let (add_key, remove_key) = TASK_KEYS[slot];
                let working = s.count_busy(id, *task);
                cl.push_clickable(
                    Line::from(vec![
                        key_span(add_key),
                        Span::styled(
                            format!("{} ({working})", task.label()),
                            enabled_style(s.idle(id) > 0),
                        ),
                    ]),
                    TASK_ADD_BASE + slot as u16,
                );
                cl.push_clickable(
                    Line::from(vec![
                        key_span(remove_key),
                        Span::styled(
                            format!("Stop {}", task.label().to_lowercase()),
                            enabled_style(working > 0),
                        ),
                    ]),
                    TASK_REMOVE_BASE + slot as u16,
                );
            }
            let in_flight = s.count_busy(id, Task::Transporting);
            if in_flight > 0 {
                cl.push(dim(format!(" {in_flight} on the road")));
            }
        }
    }

    let block = Block::default()
        .borders(borders)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Machine ");
    {
        let mut cs = click_state.borrow_mut();
        cl.register_targets(area, &mut cs, 1, 1, 0);
    }
    f.render_widget(Paragraph::new(cl.into_lines()).block(block), area);
}

fn render_cauldron(
    game: &ZeroDawnGame,
    f: &mut Frame,
    area: Rect,
    borders: Borders,
    click_state: &Rc<RefCell<ClickState>>,
) {
    let engine = &game.engine;
    let s = engine.state();
    let now = now_ms();
    let mut cl = ClickableList::new();

    if let Some(cauldron) = game.selected_cauldron().and_then(|name| s.cauldron(name)) {
        let position = s
            .cauldrons
            .iter()
            .position(|c| c.name == cauldron.name)
            .map_or(0, |p| p + 1);
        cl.push_clickable(
            Line::from(vec![
                key_span("["),
                Span::styled(
                    format!("Cauldron {:?} ({position}/{})", cauldron.name, s.cauldrons.len()),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
            ]),
            PREV_CAULDRON,
        );
        cl.push_clickable(
            Line::from(vec![
                key_span("]"),
                Span::styled(
                    format!(
                        "{:.2} materials, building {}/{}",
                        cauldron.materials,
                        cauldron.busy.len(),
                        cauldron.capacity
                    ),
                    Style::default().fg(Color::Gray),
                ),
            ]),
            NEXT_CAULDRON,
        );
        let queue: Vec<String> = cauldron
            .busy
            .iter()
            .map(|(id, started)| {
                let stats = engine.machines().get(*id);
                let done = *started as f64 + stats.creation_time * 1000.0;
                let left = ((done - now as f64) / 1000.0).max(0.0);
                format!("{} {left:.1}s", stats.name)
            })
            .collect();
        if !queue.is_empty() {
            cl.push(dim(format!("   {}", queue.join(", "))));
        }
    }

    let has_materials = s.materials > 0.0;
    for (key, label, action) in [
        ("m", "Send 10 from main reserve", SEND_SMALL),
        ("M", "Send 100 from main reserve", SEND_LARGE),
    ] {
        cl.push_clickable(
            Line::from(vec![key_span(key), Span::styled(label, enabled_style(has_materials))]),
            action,
        );
    }
    for (key, label, action) in [
        ("w", "Withdraw 10", WITHDRAW_SMALL),
        ("W", "Withdraw 100", WITHDRAW_LARGE),
    ] {
        cl.push_clickable(
            Line::from(vec![
                key_span(key),
                Span::styled(label, Style::default().fg(Color::White)),
            ]),
            action,
        );
    }

    match engine.next_cauldron() {
        Some(next) => {
            let unlocked: Vec<&str> = unlocks(next)
                .into_iter()
                .map(|id| engine.machines().get(id).name)
                .collect();
            cl.push_clickable(
                Line::from(vec![
                    key_span("n"),
                    Span::styled(
                        format!("Build Cauldron {next:?} ({:.0})", cauldron_cost(next)),
                        enabled_style(engine.can_purchase_cauldron()),
                    ),
                ]),
                BUY_CAULDRON,
            );
            if !unlocked.is_empty() {
                cl.push(dim(format!("      unlocks {}", unlocked.join(", "))));
            }
        }
        None => cl.push(dim(" Every cauldron is online.")),
    }
    if !s.transports.is_empty() {
        let carried: f64 = s.transports.iter().map(|t| t.amount).sum();
        cl.push(dim(format!(
            " {} transport(s) carrying {carried:.1}",
            s.transports.len()
        )));
    }

    let block = Block::default()
        .borders(borders)
        .border_style(Style::default().fg(Color::LightRed))
        .title(" Cauldrons ");
    {
        let mut cs = click_state.borrow_mut();
        cl.register_targets(area, &mut cs, 1, 1, 0);
    }
    f.render_widget(Paragraph::new(cl.into_lines()).block(block), area);
}

fn render_upgrades(
    game: &ZeroDawnGame,
    f: &mut Frame,
    area: Rect,
    borders: Borders,
    click_state: &Rc<RefCell<ClickState>>,
) {
    let engine = &game.engine;
    let mut cl = ClickableList::new();
    cl.push_clickable(
        Line::from(vec![
            key_span("u"),
            Span::styled("Back to machines", Style::default().fg(Color::Magenta)),
        ]),
        TOGGLE_UPGRADES,
    );

    let listed = engine.listed_upgrades();
    if listed.is_empty() {
        cl.push(Line::from(" Nothing within reach."));
    }
    for (i, upgrade) in listed.iter().enumerate() {
        let key = ((b'a' + i as u8) as char).to_string();
        let action = BUY_UPGRADE_BASE + i as u16;
        let price = upgrade
            .price
            .map(|p| format!("  {:.0} power / {:.0} materials", p.energy, p.materials))
            .unwrap_or_default();
        cl.push_clickable(
            Line::from(vec![
                key_span(&key),
                Span::styled(
                    upgrade.name,
                    enabled_style(engine.upgrade_purchasable(upgrade))
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(price, Style::default().fg(Color::DarkGray)),
            ]),
            action,
        );
        cl.push_clickable(
            Line::from(Span::styled(
                format!("     {}", upgrade.description),
                Style::default().fg(Color::DarkGray),
            )),
            action,
        );
    }

    let width = inner_width(area, borders);
    let block = Block::default()
        .borders(borders)
        .border_style(Style::default().fg(Color::Magenta))
        .title(" Upgrades ");
    {
        let mut cs = click_state.borrow_mut();
        cl.register_targets(area, &mut cs, 1, 1, width);
    }
    let widget = Paragraph::new(cl.into_lines())
        .block(block)
        .wrap(Wrap { trim: false });
    f.render_widget(widget, area);
}

fn render_log(game: &ZeroDawnGame, f: &mut Frame, area: Rect, borders: Borders) {
    let max_lines = area.height.saturating_sub(2) as usize;
    let start = game.log.len().saturating_sub(max_lines);
    let lines: Vec<Line> = game.log[start..]
        .iter()
        .map(|entry| {
            let style = if entry.is_important {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            Line::from(Span::styled(format!(" > {}", entry.text), style))
        })
        .collect();

    let block = Block::default()
        .borders(borders)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Log ");
    let widget = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
    f.render_widget(widget, area);
}
