use super::{
    ActiveTheme, AnyElement, AppView, Button, ButtonVariants, Context, DownloadState,
    FluentBuilder, IntoElement, ParentElement, Screen, Selectable, SharedString, SourceState,
    Styled, StyledExt, div, h_flex, px, v_flex,
};
use crate::source::{self, SourceSelection};

impl AppView {
    pub(super) fn initial_source_state() -> (SourceState, Vec<SourceSelection>) {
        let mut sources: Vec<SourceSelection> = match source::available_cameras() {
            Ok(cameras) => cameras.into_iter().map(SourceSelection::Camera).collect(),
            Err(err) => {
                log::error!("failed to enumerate cameras: {err}");
                Vec::new()
            }
        };
        if let Some(still) = Self::still_source_from_env() {
            sources.push(still);
        }

        if sources.is_empty() {
            return (
                SourceState::Unavailable {
                    message: "No camera found and no still image configured".to_string(),
                },
                sources,
            );
        }

        (
            SourceState::Selection {
                options: sources.clone(),
                selected: 0,
                start_error: None,
            },
            sources,
        )
    }

    pub(super) fn render_source_view(
        &mut self,
        state: &mut SourceState,
        cx: &mut Context<'_, Self>,
    ) -> AnyElement {
        let theme = cx.theme();
        let background = theme.background;
        let border = theme.border;
        let group_box = theme.group_box;
        let accent = theme.accent;
        let foreground = theme.foreground;

        match state {
            SourceState::Unavailable { message } => v_flex()
                .size_full()
                .items_center()
                .justify_center()
                .bg(background)
                .child(
                    v_flex()
                        .gap_2()
                        .p_4()
                        .rounded_lg()
                        .border_1()
                        .border_color(border)
                        .bg(group_box)
                        .child(
                            div()
                                .text_sm()
                                .font_semibold()
                                .text_color(accent)
                                .child("⚠ No input source"),
                        )
                        .child(div().text_color(foreground).child(message.clone())),
                )
                .into_any_element(),
            SourceState::Selection {
                options,
                selected,
                start_error,
            } => {
                if options.len() == 1 && self.active_stream.is_none() && start_error.is_none() {
                    let only = options[0].clone();
                    match self.start_source_for(&only) {
                        Ok(()) => {
                            self.selected_source = Some(0);
                            *state = SourceState::Ready;
                            return div().child("Starting source...").into_any_element();
                        }
                        Err(err) => {
                            *start_error = Some(err);
                        }
                    }
                }

                let picker = self.render_source_picker(
                    options.clone(),
                    *selected,
                    start_error.as_deref(),
                    false,
                    cx,
                );
                div()
                    .size_full()
                    .flex()
                    .items_center()
                    .justify_center()
                    .bg(background)
                    .child(div().w(px(420.0)).child(picker))
                    .into_any_element()
            }
            SourceState::Ready => div().child("Starting source...").into_any_element(),
        }
    }

    pub(super) fn render_source_picker(
        &mut self,
        options: Vec<SourceSelection>,
        selected: usize,
        error: Option<&str>,
        from_main: bool,
        cx: &mut Context<'_, Self>,
    ) -> AnyElement {
        let theme = cx.theme();
        let border = theme.border;
        let group_box = theme.group_box;
        let foreground = theme.foreground;
        let accent = theme.accent;

        let mut picker = v_flex()
            .gap_2()
            .p_4()
            .rounded_xl()
            .border_1()
            .border_color(border)
            .bg(group_box)
            .shadow_lg()
            .child(
                h_flex()
                    .justify_between()
                    .items_center()
                    .w_full()
                    .mb_2()
                    .child(
                        div()
                            .text_sm()
                            .font_semibold()
                            .text_color(foreground)
                            .child("Input source"),
                    )
                    .when(from_main, |this| {
                        this.child(
                            Button::new(SharedString::from("source-picker-close"))
                                .label("×")
                                .ghost()
                                .on_click(cx.listener(|this, _, _, cx| {
                                    this.picker_open = false;
                                    cx.notify();
                                })),
                        )
                    }),
            );

        for (idx, selection) in options.iter().enumerate() {
            let is_selected = selected == idx;
            let label = selection.label();
            picker = picker.child(
                Button::new(SharedString::from(format!("source-{idx}")))
                    .w_full()
                    .label(if is_selected {
                        format!("● {label}")
                    } else {
                        format!("○ {label}")
                    })
                    .selected(is_selected)
                    .on_click(cx.listener(move |this, _, _, cx| {
                        if from_main {
                            this.switch_source(idx);
                        } else {
                            this.select_source(idx);
                        }
                        cx.notify();
                    })),
            );
        }

        if let Some(err) = error {
            picker = picker.child(
                div()
                    .mt_2()
                    .p_3()
                    .rounded_lg()
                    .border_1()
                    .border_color(accent)
                    .text_xs()
                    .text_color(accent)
                    .child(err.to_string()),
            );
        }

        if !from_main {
            picker = picker.child(
                Button::new(SharedString::from("source-confirm"))
                    .primary()
                    .label("Use selected source")
                    .w_full()
                    .mt_2()
                    .on_click(cx.listener(|this, _, _, cx| {
                        this.start_selected_source();
                        cx.notify();
                    })),
            );
        }

        picker.into_any_element()
    }

    fn select_source(&mut self, idx: usize) {
        if let Screen::Source(SourceState::Selection {
            options,
            selected,
            start_error,
        }) = &mut self.screen
        {
            if idx < options.len() {
                *selected = idx;
                *start_error = None;
                self.selected_source = Some(idx);
            }
        }
    }

    fn start_selected_source(&mut self) {
        let picked = match &self.screen {
            Screen::Source(SourceState::Selection {
                options, selected, ..
            }) => options.get(*selected).cloned().map(|sel| (*selected, sel)),
            _ => None,
        };

        let Some((idx, selection)) = picked else {
            if let Screen::Source(SourceState::Selection { start_error, .. }) = &mut self.screen {
                *start_error = Some("No source selected".to_string());
            }
            return;
        };

        match self.start_source_for(&selection) {
            Ok(()) => {
                self.selected_source = Some(idx);
                self.source_error = None;
                self.picker_open = false;
                self.begin_model_download();
                self.screen = Screen::Download(DownloadState::new());
            }
            Err(err) => {
                if let Screen::Source(SourceState::Selection { start_error, .. }) = &mut self.screen
                {
                    *start_error = Some(err);
                }
            }
        }
    }

    /// Switches the live input from the main screen. The detector is reset so
    /// no temporal state from the previous stream leaks into the new one.
    pub(super) fn switch_source(&mut self, idx: usize) {
        let Some(selection) = self.sources.get(idx).cloned() else {
            self.source_error = Some("Selected source is gone".to_string());
            return;
        };

        match self.start_source_for(&selection) {
            Ok(()) => {
                self.selected_source = Some(idx);
                self.source_error = None;
                if let Some(orchestrator) = self.orchestrator.as_mut() {
                    orchestrator.handle_source_changed();
                }
            }
            Err(err) => {
                self.source_error = Some(err);
            }
        }
    }

    fn start_source_for(&mut self, selection: &SourceSelection) -> Result<(), String> {
        if let Some(stream) = self.active_stream.take() {
            drop(stream);
        }

        source::start_source(selection, self.frame_tx.clone())
            .map(|stream| {
                self.active_stream = Some(stream);
                self.canvas_image = None;
                self.grid_image = None;
            })
            .map_err(|err| format!("{err}"))
    }
}
