mod contact;
mod generate;
mod health_check;
mod profile;
mod usage;
mod wallpapers;
mod webhook;
